//! Outbound notification channels.

pub mod telegram;

use crate::model::NotifiableEvent;
use async_trait::async_trait;

pub use telegram::TelegramNotifier;

#[derive(Debug)]
pub enum DeliveryError {
    Network(reqwest::Error),
    /// The channel answered but refused the message
    Rejected(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Network(err)
    }
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Network(e) => write!(f, "Network error: {}", e),
            DeliveryError::Rejected(msg) => write!(f, "Message rejected: {}", msg),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Fire-and-forget delivery of one event.
///
/// Failures are returned to the caller, which logs them; there is no
/// redelivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, event: &NotifiableEvent) -> Result<(), DeliveryError>;

    /// Get channel name for logging
    fn channel_name(&self) -> &'static str;
}
