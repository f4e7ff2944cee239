use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use concierge_core::config::IdentityConfig;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PasswordAuthOutcome {
    Token(String),
    /// The account requires a password rotation before a token is issued;
    /// the opaque session ties the follow-up challenge answer to this
    /// authentication attempt.
    NewPasswordRequired { session: String },
}

/// Seam over the external identity provider backing `/auth`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn password_auth(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PasswordAuthOutcome, IdentityError>;

    async fn complete_new_password(
        &self,
        email: &str,
        new_password: &str,
        session: &str,
    ) -> Result<String, IdentityError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthRequest<'a> {
    client_id: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPasswordRequest<'a> {
    client_id: &'a str,
    email: &'a str,
    new_password: &'a str,
    session: &'a str,
}

#[derive(Deserialize)]
struct AuthReply {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    session: Option<String>,
}

pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    client_id: String,
}

impl HttpIdentityProvider {
    pub fn from_config(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
        })
    }

    async fn parse_reply(response: reqwest::Response) -> Result<AuthReply, IdentityError> {
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected(if detail.trim().is_empty() {
                format!("identity provider returned status {status}")
            } else {
                detail
            }));
        }
        Ok(response.json::<AuthReply>().await?)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn password_auth(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PasswordAuthOutcome, IdentityError> {
        let url = format!("{}/password-auth", self.base_url);
        let request = PasswordAuthRequest { client_id: &self.client_id, email, password };
        let response = self.client.post(&url).json(&request).send().await?;
        let reply = Self::parse_reply(response).await?;

        if let Some(token) = reply.token {
            return Ok(PasswordAuthOutcome::Token(token));
        }
        match reply.challenge.as_deref() {
            Some("new_password_required") => Ok(PasswordAuthOutcome::NewPasswordRequired {
                session: reply.session.unwrap_or_default(),
            }),
            Some(other) => {
                Err(IdentityError::Rejected(format!("unsupported auth challenge `{other}`")))
            }
            None => Err(IdentityError::Rejected(
                "identity provider returned neither token nor challenge".to_string(),
            )),
        }
    }

    async fn complete_new_password(
        &self,
        email: &str,
        new_password: &str,
        session: &str,
    ) -> Result<String, IdentityError> {
        let url = format!("{}/new-password-challenge", self.base_url);
        let request =
            NewPasswordRequest { client_id: &self.client_id, email, new_password, session };
        let response = self.client.post(&url).json(&request).send().await?;
        let reply = Self::parse_reply(response).await?;

        reply.token.ok_or_else(|| {
            IdentityError::Rejected("challenge answer produced no token".to_string())
        })
    }
}
