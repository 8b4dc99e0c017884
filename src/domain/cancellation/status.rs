//! Cancellation lifecycle state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an `EventCancellation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationStatus {
    /// Draft. Reason, impact and plan may still change.
    Pending,

    /// Organizer typed the confirmation code. Plan is frozen.
    Confirmed,

    /// Notifications and refunds are being issued.
    Processing,

    /// Processing finished. Per-item failures are reported in the results.
    Completed,

    /// Processing aborted on a catastrophic collaborator failure.
    /// May be retried.
    Failed,
}

impl CancellationStatus {
    /// Returns true while the compensation plan may still be edited.
    pub fn is_editable(&self) -> bool {
        matches!(self, CancellationStatus::Pending)
    }

    /// Returns true once confirmed. At most one cancellation per event may
    /// be active.
    pub fn is_active(&self) -> bool {
        !matches!(self, CancellationStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationStatus::Pending => "pending",
            CancellationStatus::Confirmed => "confirmed",
            CancellationStatus::Processing => "processing",
            CancellationStatus::Completed => "completed",
            CancellationStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CancellationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for CancellationStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use CancellationStatus::*;
        matches!(
            (self, target),
            (Pending, Confirmed)
                | (Confirmed, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
            // Retry after catastrophic failure
                | (Failed, Processing)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use CancellationStatus::*;
        match self {
            Pending => vec![Confirmed],
            Confirmed => vec![Processing],
            Processing => vec![Completed, Failed],
            Completed => vec![],
            Failed => vec![Processing],
        }
    }
}
