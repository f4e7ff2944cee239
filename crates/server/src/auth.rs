//! Credential issuance endpoint.
//!
//! `POST /auth` exchanges an email/password pair for a provider token. An
//! account flagged for password rotation must supply `new_password` on the
//! same call; issued tokens are persisted keyed by email so other
//! components can look them up later.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use concierge_db::repositories::TokenRepository;

use crate::identity::{IdentityError, IdentityProvider, PasswordAuthOutcome};

#[derive(Clone)]
pub struct AuthState {
    identity: Arc<dyn IdentityProvider>,
    tokens: Arc<dyn TokenRepository>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub new_password: Option<String>,
}

pub fn router(identity: Arc<dyn IdentityProvider>, tokens: Arc<dyn TokenRepository>) -> Router {
    Router::new()
        .route("/auth", post(authenticate))
        .with_state(AuthState { identity, tokens })
}

pub async fn authenticate(
    State(state): State<AuthState>,
    Json(request): Json<AuthRequest>,
) -> (StatusCode, Json<Value>) {
    if request.email.trim().is_empty() {
        return bad_request("email is required");
    }
    if request.password.trim().is_empty() {
        return bad_request("password is required");
    }

    let outcome = match state.identity.password_auth(&request.email, &request.password).await {
        Ok(outcome) => outcome,
        Err(error) => return rejected(&request.email, error),
    };

    let token = match outcome {
        PasswordAuthOutcome::Token(token) => token,
        PasswordAuthOutcome::NewPasswordRequired { session } => {
            let Some(new_password) =
                request.new_password.as_deref().filter(|value| !value.trim().is_empty())
            else {
                warn!(
                    event_name = "auth.new_password_missing",
                    contact = %request.email,
                    "challenge answer absent from request"
                );
                return bad_request("new password required");
            };

            match state
                .identity
                .complete_new_password(&request.email, new_password, &session)
                .await
            {
                Ok(token) => token,
                Err(error) => return rejected(&request.email, error),
            }
        }
    };

    if let Err(storage_error) = state.tokens.save(&request.email, &token).await {
        error!(
            event_name = "auth.token_store_failed",
            contact = %request.email,
            error = %storage_error,
            "issued token could not be persisted"
        );
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "token could not be stored"})),
        );
    }

    info!(event_name = "auth.token_issued", contact = %request.email, "credential issued");
    (StatusCode::OK, Json(json!({"token": token})))
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message})))
}

fn rejected(email: &str, error: IdentityError) -> (StatusCode, Json<Value>) {
    warn!(
        event_name = "auth.provider_rejected",
        contact = %email,
        error = %error,
        "identity provider rejected the attempt"
    );
    (StatusCode::BAD_REQUEST, Json(json!({"error": error.to_string()})))
}
