//! Intent gateway: the public chat endpoint fronting the recognizer.
//!
//! The browser client treats any non-200 as a hard failure, so this handler
//! never surfaces an error status: malformed bodies, empty utterances, and
//! recognizer outages all come back as HTTP 200 with a fallback message.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use concierge_dialogue::RecognizeText;

const MISUNDERSTOOD_MESSAGE: &str = "I'm sorry, I couldn't understand that.";
const DEPENDENCY_FAILURE_MESSAGE: &str = "Oops! Something went wrong. Please try again.";

#[derive(Clone)]
pub struct ChatState {
    recognizer: Arc<dyn RecognizeText>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub unstructured: Option<UnstructuredText>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnstructuredText {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub messages: Vec<OutgoingMessage>,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct OutgoingMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub unstructured: OutgoingText,
}

#[derive(Debug, Serialize)]
pub struct OutgoingText {
    pub text: String,
}

pub fn router(recognizer: Arc<dyn RecognizeText>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new().route("/chat", post(chat)).layer(cors).with_state(ChatState { recognizer })
}

pub async fn chat(State(state): State<ChatState>, body: Bytes) -> Json<ChatResponse> {
    // Lenient parse: a malformed body is answered like an empty one.
    let request = serde_json::from_slice::<ChatRequest>(&body).unwrap_or_default();

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let text = request
        .messages
        .first()
        .and_then(|message| message.unstructured.as_ref())
        .map(|unstructured| unstructured.text.trim().to_string())
        .filter(|text| !text.is_empty());

    let reply = match text {
        None => MISUNDERSTOOD_MESSAGE.to_string(),
        Some(text) => match state.recognizer.recognize(&session_id, &text).await {
            Ok(recognized) => match recognized.first_message() {
                Some(message) => {
                    info!(
                        event_name = "gateway.utterance_recognized",
                        session_id = %session_id,
                        "recognizer reply forwarded"
                    );
                    message.to_string()
                }
                None => MISUNDERSTOOD_MESSAGE.to_string(),
            },
            Err(error) => {
                warn!(
                    event_name = "gateway.recognizer_failed",
                    session_id = %session_id,
                    error = %error,
                    "falling back to generic failure message"
                );
                DEPENDENCY_FAILURE_MESSAGE.to_string()
            }
        },
    };

    Json(ChatResponse {
        messages: vec![OutgoingMessage {
            kind: "unstructured",
            unstructured: OutgoingText { text: reply },
        }],
        session_id,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::util::ServiceExt;

    use concierge_dialogue::recognizer::{RecognizeText, RecognizedReply, RecognizerError};

    use super::router;

    struct FakeRecognizer {
        reply: Result<Vec<String>, ()>,
    }

    #[async_trait::async_trait]
    impl RecognizeText for FakeRecognizer {
        async fn recognize(
            &self,
            _session_id: &str,
            _text: &str,
        ) -> Result<RecognizedReply, RecognizerError> {
            match &self.reply {
                Ok(messages) => Ok(RecognizedReply { messages: messages.clone() }),
                Err(()) => Err(RecognizerError::Status(reqwest::StatusCode::BAD_GATEWAY)),
            }
        }
    }

    async fn post_chat(
        recognizer: FakeRecognizer,
        body: &str,
    ) -> (StatusCode, Option<String>, serde_json::Value) {
        let app = router(Arc::new(recognizer));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ORIGIN, "http://chat.example.com")
            .body(Body::from(body.to_string()))
            .expect("build request");

        let response = app.oneshot(request).await.expect("oneshot");
        let status = response.status();
        let allow_origin = response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|value| value.to_str().expect("header").to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        (status, allow_origin, payload)
    }

    fn reply_text(payload: &serde_json::Value) -> &str {
        payload["messages"][0]["unstructured"]["text"].as_str().expect("reply text")
    }

    #[tokio::test]
    async fn forwards_the_first_recognizer_message_and_echoes_the_session() {
        let recognizer =
            FakeRecognizer { reply: Ok(vec!["Please provide your Location.".to_string()]) };
        let body = r#"{
            "sessionId": "session-42",
            "messages": [{"unstructured": {"text": "I need dining suggestions"}}]
        }"#;

        let (status, allow_origin, payload) = post_chat(recognizer, body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(allow_origin.as_deref(), Some("*"));
        assert_eq!(reply_text(&payload), "Please provide your Location.");
        assert_eq!(payload["messages"][0]["type"], "unstructured");
        assert_eq!(payload["sessionId"], "session-42");
    }

    #[tokio::test]
    async fn generates_a_session_id_when_the_request_carries_none() {
        let recognizer = FakeRecognizer { reply: Ok(vec!["Hi there, how can I help?".to_string()]) };
        let body = r#"{"messages": [{"unstructured": {"text": "hello"}}]}"#;

        let (status, _, payload) = post_chat(recognizer, body).await;

        assert_eq!(status, StatusCode::OK);
        let session_id = payload["sessionId"].as_str().expect("session id");
        assert!(!session_id.is_empty());
    }

    #[tokio::test]
    async fn empty_utterance_gets_the_misunderstood_fallback() {
        let recognizer = FakeRecognizer { reply: Ok(vec!["unreachable".to_string()]) };
        let body = r#"{"messages": [{"unstructured": {"text": "   "}}]}"#;

        let (status, _, payload) = post_chat(recognizer, body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply_text(&payload), "I'm sorry, I couldn't understand that.");
    }

    #[tokio::test]
    async fn malformed_body_still_answers_with_http_200() {
        let recognizer = FakeRecognizer { reply: Ok(vec!["unreachable".to_string()]) };

        let (status, allow_origin, payload) = post_chat(recognizer, "this is not json").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(allow_origin.as_deref(), Some("*"));
        assert_eq!(reply_text(&payload), "I'm sorry, I couldn't understand that.");
    }

    #[tokio::test]
    async fn recognizer_failure_gets_the_generic_failure_message() {
        let recognizer = FakeRecognizer { reply: Err(()) };
        let body = r#"{"messages": [{"unstructured": {"text": "dinner ideas"}}]}"#;

        let (status, _, payload) = post_chat(recognizer, body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply_text(&payload), "Oops! Something went wrong. Please try again.");
    }

    #[tokio::test]
    async fn recognizer_reply_without_messages_gets_the_misunderstood_fallback() {
        let recognizer = FakeRecognizer { reply: Ok(Vec::new()) };
        let body = r#"{"messages": [{"unstructured": {"text": "dinner ideas"}}]}"#;

        let (_, _, payload) = post_chat(recognizer, body).await;

        assert_eq!(reply_text(&payload), "I'm sorry, I couldn't understand that.");
    }
}
