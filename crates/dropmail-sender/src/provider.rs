use async_trait::async_trait;

use crate::error::SendError;

/// One fully rendered message for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub html_body: String,
}

/// Transactional email provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Sends one message, returning the provider's message id when it has one.
    async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>, SendError>;
}
