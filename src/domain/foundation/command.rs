//! Request context carried through command handlers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Who issued a command and how to correlate what it caused.
///
/// Handlers stamp the correlation id and user onto every event they
/// publish.
///
/// # Example
///
/// ```ignore
/// let envelope = event
///     .to_envelope()
///     .with_correlation_id(metadata.correlation_id())
///     .with_user_id(metadata.user_id.to_string());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// The organizer or operator executing the command.
    pub user_id: UserId,

    /// Links the events of one request. Generated when not supplied.
    correlation_id: String,

    /// Where the command came from ("api", "test", ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl CommandMetadata {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            correlation_id: Uuid::new_v4().to_string(),
            source: None,
        }
    }

    /// Builder: use an upstream correlation id (e.g. an `x-request-id` header).
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = id.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}
