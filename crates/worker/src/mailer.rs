use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use thiserror::Error;

use concierge_core::config::SmtpConfig;
use concierge_core::domain::restaurant::RestaurantRecord;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build mail message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Delivery seam for recommendation emails. A send that returns an error
/// leaves the originating queue message in place for a later retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpNotifier {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.relay)?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        Ok(Self { transport: builder.build(), sender: config.sender.parse()? })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(to.parse()?)
            .subject(subject)
            .body(body.to_string())?;

        self.transport.send(message).await?;
        Ok(())
    }
}

pub fn recommendation_subject(cuisine: &str) -> String {
    format!("Your recommendations for {cuisine} cuisine are here")
}

pub fn recommendation_body(cuisine: &str, restaurants: &[RestaurantRecord]) -> String {
    let mut body = format!("Hello! Here are my {cuisine} restaurant suggestions:\n\n");
    for (position, restaurant) in restaurants.iter().enumerate() {
        body.push_str(&format!(
            "{}. {}, located at {}\n",
            position + 1,
            restaurant.name,
            restaurant.address
        ));
    }
    body.push_str("\nEnjoy your meal!");
    body
}
