//! Messaging provider port for attendee notifications.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::catalog::Attendee;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors from message delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    #[error("invalid recipient {recipient}: {reason}")]
    InvalidRecipient { recipient: String, reason: String },

    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("messaging provider unavailable: {0}")]
    Unavailable(String),
}

impl From<MessagingError> for DomainError {
    fn from(err: MessagingError) -> Self {
        DomainError::new(ErrorCode::MessagingFailed, err.to_string())
    }
}

/// Port for delivering cancellation notices.
///
/// One call delivers one message to one recipient. Failures are reported
/// per recipient and never abort a batch.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// Send the cancellation notice to `recipient`.
    async fn send_cancellation_notice(
        &self,
        recipient: &Attendee,
        subject: &str,
        body: &str,
    ) -> Result<(), MessagingError>;
}
