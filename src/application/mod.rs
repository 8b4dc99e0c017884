//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::{
    CalculateImpactHandler, CalculateImpactQuery, CancellationWorkflow,
    ConfirmAndProcessCommand, ConfirmAndProcessHandler, ConfirmCancellationCommand,
    ConfirmCancellationHandler, CreateCancellationCommand, CreateCancellationHandler,
    GetCancellationHandler, GetCancellationQuery, ImpactAssessment, PreviewNotificationHandler,
    PreviewNotificationQuery, ProcessCancellationCommand, ProcessCancellationHandler,
    ProcessCancellationResult, ProcessingSettings, ProgressReporter,
    UpdateCompensationPlanCommand, UpdateCompensationPlanHandler,
};
