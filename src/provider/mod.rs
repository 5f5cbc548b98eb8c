//! Outbound provider collaborator.
//!
//! The engine only requires "send one message, report success/failure/id".
//! Wire-level integration with any concrete messaging provider lives behind
//! [`ProviderClient`]; the engine interprets the error taxonomy to decide
//! between retry and terminal failure.

mod mock;

pub use mock::MockProvider;

use std::sync::Arc;

use async_trait::async_trait;

use crate::campaign::CampaignId;

/// Message handed to the provider for one contact.
#[derive(Debug, Clone)]
pub struct MessagePayload {
    /// Campaign the message belongs to
    pub campaign_id: CampaignId,
    /// Rendered message body
    pub body: String,
}

/// Successful provider acknowledgement.
#[derive(Debug, Clone)]
pub struct ProviderAck {
    /// Provider-assigned message identifier
    pub message_id: String,
}

/// Send failure, classified for retry handling.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    #[error("timed out waiting for provider response")]
    Timeout,

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("throttled by provider")]
    Throttled,

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("provider rejected message: {0}")]
    Rejected(String),

    #[error("recipient has opted out")]
    RecipientOptedOut,
}

impl SendError {
    /// Check whether the failure is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Unavailable(_) | Self::Throttled
        )
    }
}

/// Sends one outbound message to one destination.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Deliver `payload` to `destination`.
    async fn send(
        &self,
        destination: &str,
        payload: &MessagePayload,
    ) -> Result<ProviderAck, SendError>;
}

/// Shared provider handle.
pub type SharedProvider = Arc<dyn ProviderClient>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(SendError::Timeout.is_transient());
        assert!(SendError::Unavailable("503".into()).is_transient());
        assert!(SendError::Throttled.is_transient());
        assert!(!SendError::InvalidDestination("abc".into()).is_transient());
        assert!(!SendError::Rejected("spam".into()).is_transient());
        assert!(!SendError::RecipientOptedOut.is_transient());
    }
}
