//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod cancellation;

pub use cancellation::{
    // Commands
    ConfirmAndProcessCommand, ConfirmAndProcessHandler,
    ConfirmCancellationCommand, ConfirmCancellationHandler,
    CreateCancellationCommand, CreateCancellationHandler,
    ProcessCancellationCommand, ProcessCancellationHandler, ProcessCancellationResult,
    ProcessingSettings,
    UpdateCompensationPlanCommand, UpdateCompensationPlanHandler,
    // Queries
    CalculateImpactHandler, CalculateImpactQuery, ImpactAssessment,
    GetCancellationHandler, GetCancellationQuery,
    PreviewNotificationHandler, PreviewNotificationQuery,
    // Workflow
    CancellationWorkflow, ProgressReporter,
};
