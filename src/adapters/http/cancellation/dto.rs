//! Request and response DTOs for cancellation endpoints.
//!
//! Domain value types (impact, plan, wizard, progress) already serialize in
//! their wire form and are embedded as-is.

use serde::{Deserialize, Serialize};

use crate::domain::cancellation::{
    CancellationImpact, CancellationProgress, CancellationReason, CancellationStatus,
    CancellationWizard, CompensationPlan, CompensationRequest, EventCancellation,
    ProcessingResults, RefundRecord,
};
use crate::domain::foundation::{CancellationId, EventId, Money, Timestamp, UserId};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// Request to create a pending cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCancellationRequest {
    pub event_id: EventId,
    pub reason: CancellationReason,
    #[serde(default)]
    pub reason_note: Option<String>,
}

/// Request to preview the attendee notice before anything is persisted.
///
/// Impact and plan are computed server-side from these choices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewNotificationRequest {
    pub event_id: EventId,
    pub reason: CancellationReason,
    #[serde(default)]
    pub reason_note: Option<String>,
    pub compensation: CompensationRequest,
}

/// Request to confirm a cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmCancellationRequest {
    pub confirmation_code: String,
}

/// Request to open a wizard for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartWizardRequest {
    pub event_id: EventId,
}

/// Request carrying the client's current wizard snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardRequest {
    pub wizard: CancellationWizard,
}

/// Request to change compensation choices on a wizard snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardCompensationRequest {
    pub wizard: CancellationWizard,
    pub compensation: CompensationRequest,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

/// Cancellation details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationResponse {
    pub id: CancellationId,
    pub event_id: EventId,
    pub event_title: String,
    pub organizer_id: UserId,
    pub reason: CancellationReason,
    pub reason_note: Option<String>,
    pub status: CancellationStatus,
    pub impact: CancellationImpact,
    pub plan: Option<CompensationPlan>,
    pub initiated_by: UserId,
    pub confirmed_by: Option<UserId>,
    pub confirmed_at: Option<Timestamp>,
    pub results: ProcessingResults,
    pub refunded_amount: Money,
    pub refunds: Vec<RefundRecord>,
    pub processing_attempts: u32,
    pub failure_reason: Option<String>,
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl From<EventCancellation> for CancellationResponse {
    fn from(c: EventCancellation) -> Self {
        let results = c.results();
        let refunded_amount = c.refunded_amount();
        Self {
            id: c.id,
            event_id: c.event_id,
            event_title: c.event_title,
            organizer_id: c.organizer_id,
            reason: c.reason,
            reason_note: c.reason_note,
            status: c.status,
            impact: c.impact,
            plan: c.plan,
            initiated_by: c.initiated_by,
            confirmed_by: c.confirmed_by,
            confirmed_at: c.confirmed_at,
            results,
            refunded_amount,
            refunds: c.refund_records,
            processing_attempts: c.processing_attempts,
            failure_reason: c.failure_reason,
            version: c.version,
            created_at: c.created_at,
            updated_at: c.updated_at,
            completed_at: c.completed_at,
        }
    }
}

/// Result of a processing run with every progress update it emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessCancellationResponse {
    pub cancellation: CancellationResponse,
    pub results: ProcessingResults,
    pub progress: Vec<CancellationProgress>,
}

/// Wizard snapshot returned after each wizard call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardResponse {
    pub can_proceed: bool,
    pub wizard: CancellationWizard,
}

impl From<CancellationWizard> for WizardResponse {
    fn from(wizard: CancellationWizard) -> Self {
        Self {
            can_proceed: wizard.can_proceed(),
            wizard,
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create an error response with details.
    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}
