//! Cancellation handlers.
//!
//! Command and query handlers for the event cancellation workflow:
//!
//! ## Commands
//! - Creating a pending cancellation
//! - Attaching or replacing the compensation plan
//! - Confirming with the typed `CONFIRM` code
//! - Processing refunds and notifications
//! - Submitting a finished wizard in one call
//!
//! ## Queries
//! - Impact of cancelling an event
//! - Notification preview
//! - Get cancellation details
//!
//! `CancellationWorkflow` drives the organizer's wizard between steps.

mod calculate_impact;
mod confirm_and_process;
mod confirm_cancellation;
mod create_cancellation;
mod get_cancellation;
mod preview_notification;
mod process_cancellation;
mod progress_reporter;
mod support;
mod update_compensation_plan;
mod workflow;

#[cfg(test)]
mod fixtures;

// Commands
pub use confirm_and_process::{ConfirmAndProcessCommand, ConfirmAndProcessHandler};
pub use confirm_cancellation::{ConfirmCancellationCommand, ConfirmCancellationHandler};
pub use create_cancellation::{CreateCancellationCommand, CreateCancellationHandler};
pub use process_cancellation::{
    ProcessCancellationCommand, ProcessCancellationHandler, ProcessCancellationResult,
    ProcessingSettings,
};
pub use update_compensation_plan::{UpdateCompensationPlanCommand, UpdateCompensationPlanHandler};

// Queries
pub use calculate_impact::{CalculateImpactHandler, CalculateImpactQuery, ImpactAssessment};
pub use get_cancellation::{GetCancellationHandler, GetCancellationQuery};
pub use preview_notification::{PreviewNotificationHandler, PreviewNotificationQuery};

// Workflow
pub use progress_reporter::ProgressReporter;
pub use workflow::CancellationWorkflow;
