//! In-memory messaging provider.
//!
//! Records every delivered notice instead of sending it. Recipients can be
//! configured to fail, and the whole provider can be taken offline.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::catalog::Attendee;
use crate::domain::foundation::UserId;
use crate::ports::{MessagingError, MessagingProvider};

/// A notice accepted for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: UserId,
    pub email: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
struct MessagingState {
    sent: Vec<SentMessage>,
    failing: HashSet<UserId>,
    offline: Option<String>,
}

/// Messaging provider that keeps delivered notices in memory.
#[derive(Clone, Default)]
pub struct InMemoryMessagingProvider {
    inner: Arc<Mutex<MessagingState>>,
}

impl InMemoryMessagingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MessagingState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliveries to `recipient` are rejected until `restore`.
    pub fn fail_recipient(&self, recipient: UserId) {
        self.state().failing.insert(recipient);
    }

    pub fn set_offline(&self, reason: impl Into<String>) {
        self.state().offline = Some(reason.into());
    }

    pub fn restore(&self) {
        let mut state = self.state();
        state.failing.clear();
        state.offline = None;
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state().sent.clone()
    }

    /// Number of notices delivered to `recipient`.
    pub fn delivered_to(&self, recipient: &UserId) -> usize {
        self.state()
            .sent
            .iter()
            .filter(|m| m.recipient == *recipient)
            .count()
    }
}

#[async_trait]
impl MessagingProvider for InMemoryMessagingProvider {
    async fn send_cancellation_notice(
        &self,
        recipient: &Attendee,
        subject: &str,
        body: &str,
    ) -> Result<(), MessagingError> {
        let mut state = self.state();

        if let Some(reason) = &state.offline {
            return Err(MessagingError::Unavailable(reason.clone()));
        }

        if !recipient.email.contains('@') {
            return Err(MessagingError::InvalidRecipient {
                recipient: recipient.user_id.to_string(),
                reason: format!("'{}' is not an email address", recipient.email),
            });
        }

        if state.failing.contains(&recipient.user_id) {
            return Err(MessagingError::Rejected(format!(
                "mailbox for {} rejected the message",
                recipient.user_id
            )));
        }

        state.sent.push(SentMessage {
            recipient: recipient.user_id.clone(),
            email: recipient.email.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
        });

        tracing::debug!(recipient = %recipient.user_id, "Cancellation notice delivered");
        Ok(())
    }
}
