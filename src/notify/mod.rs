// Notification delivery

pub mod message;
pub mod telegram;

#[cfg(test)]
mod tests;

use crate::error::NotifyError;
use async_trait::async_trait;

pub use message::{escape_html, Alert, NotificationKind};
pub use telegram::TelegramNotifier;

/// A rendered message ready for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    /// Urgent messages are never sent silently
    pub urgent: bool,
}

impl OutgoingMessage {
    pub fn new(text: impl Into<String>, urgent: bool) -> Self {
        Self {
            text: text.into(),
            urgent,
        }
    }
}

impl From<&Alert<'_>> for OutgoingMessage {
    fn from(alert: &Alert<'_>) -> Self {
        Self::new(alert.render(), alert.kind.is_urgent())
    }
}

/// Delivers one message; failures are reported, never retried
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), NotifyError>;
}
