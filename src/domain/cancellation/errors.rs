//! Cancellation-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotOrganizer | 403 |
//! | EventNotFound, CancellationNotFound | 404 |
//! | InvalidCompensationParameters, InvalidConfirmationCode, MissingReason, StepIncomplete | 422 |
//! | EventAlreadyCancelled, CancellationInProgress, PlanAlreadyFinalized, InvalidState, ConcurrentModification | 409 |
//! | OperationCancelled | 409 |
//! | ProcessorUnavailable, Collaborator | 503 |
//! | Persistence | 500 |

use crate::domain::foundation::{CancellationId, DomainError, ErrorCode, EventId, UserId};

use super::CancellationStep;

/// Coarse classification used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input. Shown inline, never retried.
    Validation,
    /// Caller may not act on this event.
    Authorization,
    /// Request conflicts with stored state. Reload before retrying.
    Consistency,
    /// Collaborator hiccup. Safe to retry.
    Transient,
    /// Collaborator down. Processing aborted; retry later.
    Catastrophic,
}

/// Errors raised by the cancellation workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationError {
    /// The catalog has no such event.
    EventNotFound(EventId),

    /// A completed cancellation already exists for this event.
    EventAlreadyCancelled(EventId),

    /// Another cancellation of this event was already confirmed.
    CancellationInProgress {
        event_id: EventId,
        cancellation_id: CancellationId,
    },

    /// Caller is not the organizer of the event.
    NotOrganizer { user_id: UserId, event_id: EventId },

    /// No cancellation with this id.
    CancellationNotFound(CancellationId),

    /// Refund percentage or credit multiplier missing or out of range.
    InvalidCompensationParameters { field: String, reason: String },

    /// Confirmation text did not match.
    InvalidConfirmationCode,

    /// The plan can no longer be edited.
    PlanAlreadyFinalized(CancellationId),

    /// Advancing from the first step without a reason.
    MissingReason,

    /// Current wizard step's requirement is not met.
    StepIncomplete {
        step: CancellationStep,
        requirement: String,
    },

    /// Operation not allowed in the current lifecycle state.
    InvalidState { current: String, attempted: String },

    /// Optimistic concurrency check failed.
    ConcurrentModification(CancellationId),

    /// Payment processor is down; processing stopped.
    ProcessorUnavailable(String),

    /// Caller cancelled before refunds started.
    OperationCancelled,

    /// Repository failure.
    Persistence(String),

    /// Catalog, ledger or messaging failure outside refund processing.
    Collaborator { service: String, message: String },
}

impl CancellationError {
    pub fn event_not_found(id: EventId) -> Self {
        CancellationError::EventNotFound(id)
    }

    pub fn event_already_cancelled(id: EventId) -> Self {
        CancellationError::EventAlreadyCancelled(id)
    }

    pub fn cancellation_in_progress(event_id: EventId, cancellation_id: CancellationId) -> Self {
        CancellationError::CancellationInProgress {
            event_id,
            cancellation_id,
        }
    }

    pub fn not_organizer(user_id: UserId, event_id: EventId) -> Self {
        CancellationError::NotOrganizer { user_id, event_id }
    }

    pub fn cancellation_not_found(id: CancellationId) -> Self {
        CancellationError::CancellationNotFound(id)
    }

    pub fn invalid_compensation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CancellationError::InvalidCompensationParameters {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_confirmation_code() -> Self {
        CancellationError::InvalidConfirmationCode
    }

    pub fn plan_already_finalized(id: CancellationId) -> Self {
        CancellationError::PlanAlreadyFinalized(id)
    }

    pub fn step_incomplete(step: CancellationStep, requirement: impl Into<String>) -> Self {
        CancellationError::StepIncomplete {
            step,
            requirement: requirement.into(),
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        CancellationError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn processor_unavailable(message: impl Into<String>) -> Self {
        CancellationError::ProcessorUnavailable(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        CancellationError::Persistence(message.into())
    }

    pub fn collaborator(service: impl Into<String>, message: impl Into<String>) -> Self {
        CancellationError::Collaborator {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Translates a repository error for the given aggregate.
    pub fn from_repository(err: DomainError, id: CancellationId) -> Self {
        match err.code {
            ErrorCode::ConcurrentModification => CancellationError::ConcurrentModification(id),
            ErrorCode::CancellationInProgress => {
                let event_id = err.details.get("event_id").and_then(|v| v.parse().ok());
                let active = err
                    .details
                    .get("active_cancellation_id")
                    .and_then(|v| v.parse().ok());
                match (event_id, active) {
                    (Some(event_id), Some(active)) => {
                        CancellationError::cancellation_in_progress(event_id, active)
                    }
                    _ => CancellationError::Persistence(err.to_string()),
                }
            }
            ErrorCode::CancellationNotFound | ErrorCode::NotFound => {
                CancellationError::CancellationNotFound(id)
            }
            _ => CancellationError::Persistence(err.to_string()),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CancellationError::EventNotFound(_) => ErrorCode::EventNotFound,
            CancellationError::EventAlreadyCancelled(_) => ErrorCode::EventAlreadyCancelled,
            CancellationError::CancellationInProgress { .. } => ErrorCode::CancellationInProgress,
            CancellationError::NotOrganizer { .. } => ErrorCode::Forbidden,
            CancellationError::CancellationNotFound(_) => ErrorCode::CancellationNotFound,
            CancellationError::InvalidCompensationParameters { .. } => {
                ErrorCode::InvalidCompensationParameters
            }
            CancellationError::InvalidConfirmationCode => ErrorCode::InvalidConfirmationCode,
            CancellationError::PlanAlreadyFinalized(_) => ErrorCode::PlanAlreadyFinalized,
            CancellationError::MissingReason => ErrorCode::MissingReason,
            CancellationError::StepIncomplete { .. } => ErrorCode::StepIncomplete,
            CancellationError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            CancellationError::ConcurrentModification(_) => ErrorCode::ConcurrentModification,
            CancellationError::ProcessorUnavailable(_) => ErrorCode::ProcessorUnavailable,
            CancellationError::OperationCancelled => ErrorCode::OperationCancelled,
            CancellationError::Persistence(_) => ErrorCode::DatabaseError,
            CancellationError::Collaborator { .. } => ErrorCode::ExternalServiceError,
        }
    }

    /// Returns the category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CancellationError::InvalidCompensationParameters { .. }
            | CancellationError::InvalidConfirmationCode
            | CancellationError::MissingReason
            | CancellationError::StepIncomplete { .. } => ErrorCategory::Validation,
            CancellationError::NotOrganizer { .. } => ErrorCategory::Authorization,
            CancellationError::EventNotFound(_)
            | CancellationError::CancellationNotFound(_)
            | CancellationError::EventAlreadyCancelled(_)
            | CancellationError::CancellationInProgress { .. }
            | CancellationError::PlanAlreadyFinalized(_)
            | CancellationError::InvalidState { .. }
            | CancellationError::ConcurrentModification(_)
            | CancellationError::OperationCancelled => ErrorCategory::Consistency,
            CancellationError::Persistence(_) | CancellationError::Collaborator { .. } => {
                ErrorCategory::Transient
            }
            CancellationError::ProcessorUnavailable(_) => ErrorCategory::Catastrophic,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            CancellationError::EventNotFound(id) => format!("Event not found: {}", id),
            CancellationError::EventAlreadyCancelled(id) => {
                format!("Event {} has already been cancelled", id)
            }
            CancellationError::CancellationInProgress {
                event_id,
                cancellation_id,
            } => format!(
                "Event {} already has cancellation {} confirmed",
                event_id, cancellation_id
            ),
            CancellationError::NotOrganizer { user_id, event_id } => {
                format!("User {} is not the organizer of event {}", user_id, event_id)
            }
            CancellationError::CancellationNotFound(id) => {
                format!("Cancellation not found: {}", id)
            }
            CancellationError::InvalidCompensationParameters { field, reason } => {
                format!("Invalid compensation parameter '{}': {}", field, reason)
            }
            CancellationError::InvalidConfirmationCode => {
                "Type CONFIRM to confirm the cancellation".to_string()
            }
            CancellationError::PlanAlreadyFinalized(id) => {
                format!("Compensation plan for cancellation {} can no longer be changed", id)
            }
            CancellationError::MissingReason => "Select a cancellation reason".to_string(),
            CancellationError::StepIncomplete { step, requirement } => {
                format!("Step '{}' is not complete: {}", step, requirement)
            }
            CancellationError::InvalidState { current, attempted } => {
                format!("Cannot {} a cancellation in {} state", attempted, current)
            }
            CancellationError::ConcurrentModification(id) => {
                format!("Cancellation {} was modified concurrently; reload and retry", id)
            }
            CancellationError::ProcessorUnavailable(msg) => {
                format!("Payment processor unavailable: {}", msg)
            }
            CancellationError::OperationCancelled => {
                "Operation cancelled before refunds started".to_string()
            }
            CancellationError::Persistence(msg) => format!("Storage error: {}", msg),
            CancellationError::Collaborator { service, message } => {
                format!("{} error: {}", service, message)
            }
        }
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transient | ErrorCategory::Catastrophic
        ) || matches!(self, CancellationError::ConcurrentModification(_))
    }
}

impl std::fmt::Display for CancellationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CancellationError {}

impl From<DomainError> for CancellationError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::DatabaseError | ErrorCode::ConcurrentModification => {
                CancellationError::Persistence(err.to_string())
            }
            ErrorCode::ProcessorUnavailable => {
                CancellationError::ProcessorUnavailable(err.message().to_string())
            }
            ErrorCode::PaymentFailed => CancellationError::collaborator("payment", err.message()),
            ErrorCode::MessagingFailed => {
                CancellationError::collaborator("messaging", err.message())
            }
            _ => CancellationError::collaborator("external", err.to_string()),
        }
    }
}

impl From<CancellationError> for DomainError {
    fn from(err: CancellationError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
