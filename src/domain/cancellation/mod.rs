//! Cancellation domain.
//!
//! Everything needed to cancel a ticketed event: impact analysis,
//! compensation planning, attendee notification, the organizer's step
//! sequence and the `EventCancellation` aggregate that carries a
//! cancellation from draft to completed refunds.

mod aggregate;
mod compensation;
mod confirmation;
mod errors;
mod events;
mod impact;
mod notification;
mod progress;
mod reason;
mod status;
mod wizard;

pub use aggregate::{EventCancellation, ProcessingResults, RefundOutcome, RefundRecord};
pub use compensation::{
    CompensationPlan, CompensationPlanner, CompensationRequest, CompensationType,
    ProcessingMethod, RefundAllocation, RefundChannel, MAX_CREDIT_MULTIPLIER,
    MAX_REFUND_PERCENTAGE, MIN_CREDIT_MULTIPLIER, MIN_REFUND_PERCENTAGE,
};
pub use confirmation::{is_valid_confirmation, verify_confirmation, CONFIRMATION_TOKEN};
pub use errors::{CancellationError, ErrorCategory};
pub use events::{CancellationEvent, CancellationEventKind};
pub use impact::{
    CancellationImpact, CancellationWarning, ImpactCalculator, ImpactPolicy,
    PaymentMethodBreakdown, ProcessingTimeEstimate, TicketTypeBreakdown, WarningSeverity,
};
pub use notification::{
    CancellationDraft, NotificationPreview, NotificationPreviewer, NotificationTemplate,
    SAMPLE_RECIPIENT_LIMIT,
};
pub use progress::{CancellationProgress, ProcessingPhase, ProgressTracker};
pub use reason::CancellationReason;
pub use status::CancellationStatus;
pub use wizard::{CancellationStep, CancellationWizard};
