use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use concierge_core::config::RecognizerConfig;

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("recognizer transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("recognizer returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Structured reply from the intent recognizer: zero or more response texts
/// in the order the recognizer produced them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecognizedReply {
    pub messages: Vec<String>,
}

impl RecognizedReply {
    pub fn first_message(&self) -> Option<&str> {
        self.messages.first().map(String::as_str)
    }
}

#[async_trait]
pub trait RecognizeText: Send + Sync {
    async fn recognize(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<RecognizedReply, RecognizerError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeTextRequest<'a> {
    bot_id: &'a str,
    locale_id: &'a str,
    session_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct RecognizeTextResponse {
    #[serde(default)]
    messages: Vec<RecognizedMessage>,
}

#[derive(Deserialize)]
struct RecognizedMessage {
    content: String,
}

/// HTTP client for the recognizer's `recognize-text` endpoint.
pub struct HttpRecognizer {
    client: Client,
    base_url: String,
    bot_id: String,
    locale: String,
}

impl HttpRecognizer {
    pub fn from_config(config: &RecognizerConfig) -> Result<Self, RecognizerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bot_id: config.bot_id.clone(),
            locale: config.locale.clone(),
        })
    }
}

#[async_trait]
impl RecognizeText for HttpRecognizer {
    async fn recognize(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<RecognizedReply, RecognizerError> {
        let url = format!("{}/recognize-text", self.base_url);
        let request = RecognizeTextRequest {
            bot_id: &self.bot_id,
            locale_id: &self.locale,
            session_id,
            text,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RecognizerError::Status(status));
        }

        let reply = response.json::<RecognizeTextResponse>().await?;
        Ok(RecognizedReply {
            messages: reply.messages.into_iter().map(|message| message.content).collect(),
        })
    }
}
