//! Dialogue webhook: the recognizer calls back here once it has classified
//! an intent, and the fulfiller decides the next conversational move.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::error;

use concierge_core::domain::dialogue::{DialogueRequest, DialogueResponse};
use concierge_db::repositories::{SqlPreferenceRepository, SqlRequestQueue};
use concierge_dialogue::{DialogueError, DialogueFulfiller};

pub type SqlDialogueFulfiller = DialogueFulfiller<SqlPreferenceRepository, SqlRequestQueue>;

#[derive(Clone)]
pub struct DialogueState {
    fulfiller: Arc<SqlDialogueFulfiller>,
}

pub fn router(fulfiller: Arc<SqlDialogueFulfiller>) -> Router {
    Router::new().route("/dialogue", post(fulfill)).with_state(DialogueState { fulfiller })
}

pub async fn fulfill(
    State(state): State<DialogueState>,
    Json(request): Json<DialogueRequest>,
) -> Result<Json<DialogueResponse>, (StatusCode, Json<Value>)> {
    match state.fulfiller.handle(request).await {
        Ok(response) => Ok(Json(response)),
        Err(DialogueError::InvalidIntent(name)) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("unsupported intent `{name}`")})),
        )),
        Err(error) => {
            error!(
                event_name = "dialogue.fulfillment_failed",
                error = %error,
                "turn aborted by dependency failure"
            );
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "dialogue fulfillment failed"})),
            ))
        }
    }
}
