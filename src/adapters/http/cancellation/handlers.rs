//! HTTP handlers for cancellation endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.
//! Processing runs on a spawned task so a client disconnect cannot stop
//! refunds half way; before refunds start a disconnect cancels the submission.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Json, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tokio::sync::{mpsc, watch};

use crate::application::handlers::cancellation::{
    CalculateImpactHandler, CalculateImpactQuery, CancellationWorkflow, ConfirmAndProcessCommand,
    ConfirmAndProcessHandler, ConfirmCancellationCommand, ConfirmCancellationHandler,
    CreateCancellationCommand, CreateCancellationHandler, GetCancellationHandler,
    GetCancellationQuery, PreviewNotificationHandler, PreviewNotificationQuery,
    ProcessCancellationCommand, ProcessCancellationHandler, ProcessCancellationResult,
    ProcessingSettings, ProgressReporter, UpdateCompensationPlanCommand,
    UpdateCompensationPlanHandler,
};
use crate::domain::cancellation::{
    CancellationDraft, CancellationError, CancellationProgress, CompensationPlanner,
    ErrorCategory, ImpactCalculator,
};
use crate::domain::foundation::{CancellationId, CommandMetadata, EventId, UserId};
use crate::ports::{
    CancellationRepository, EventCatalog, EventPublisher, MessagingProvider, PaymentLedger,
};

use super::dto::{
    CancellationResponse, ConfirmCancellationRequest, CreateCancellationRequest, ErrorResponse,
    PreviewNotificationRequest, ProcessCancellationResponse, StartWizardRequest,
    WizardCompensationRequest, WizardRequest, WizardResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped dependencies
/// for efficient sharing across handlers.
#[derive(Clone)]
pub struct CancellationAppState {
    pub catalog: Arc<dyn EventCatalog>,
    pub ledger: Arc<dyn PaymentLedger>,
    pub messaging: Arc<dyn MessagingProvider>,
    pub repository: Arc<dyn CancellationRepository>,
    pub event_publisher: Arc<dyn EventPublisher>,
    pub calculator: ImpactCalculator,
    pub processing: ProcessingSettings,
    pub progress_capacity: usize,
    pub verbose_errors: bool,
}

impl CancellationAppState {
    pub fn new(
        catalog: Arc<dyn EventCatalog>,
        ledger: Arc<dyn PaymentLedger>,
        messaging: Arc<dyn MessagingProvider>,
        repository: Arc<dyn CancellationRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        calculator: ImpactCalculator,
    ) -> Self {
        Self {
            catalog,
            ledger,
            messaging,
            repository,
            event_publisher,
            calculator,
            processing: ProcessingSettings::default(),
            progress_capacity: 64,
            verbose_errors: true,
        }
    }

    pub fn with_processing(mut self, settings: ProcessingSettings, progress_capacity: usize) -> Self {
        self.processing = settings;
        self.progress_capacity = progress_capacity;
        self
    }

    pub fn with_verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }

    // Create handlers on demand from the shared state.

    pub fn impact_handler(&self) -> Arc<CalculateImpactHandler> {
        Arc::new(CalculateImpactHandler::new(
            self.catalog.clone(),
            self.ledger.clone(),
            self.repository.clone(),
            self.calculator.clone(),
        ))
    }

    pub fn preview_handler(&self) -> Arc<PreviewNotificationHandler> {
        Arc::new(PreviewNotificationHandler::new(self.ledger.clone()))
    }

    pub fn create_handler(&self) -> Arc<CreateCancellationHandler> {
        Arc::new(CreateCancellationHandler::new(
            self.impact_handler(),
            self.repository.clone(),
            self.event_publisher.clone(),
        ))
    }

    pub fn get_handler(&self) -> GetCancellationHandler {
        GetCancellationHandler::new(self.repository.clone())
    }

    pub fn update_plan_handler(&self) -> Arc<UpdateCompensationPlanHandler> {
        Arc::new(UpdateCompensationPlanHandler::new(
            self.repository.clone(),
            self.event_publisher.clone(),
        ))
    }

    pub fn confirm_handler(&self) -> Arc<ConfirmCancellationHandler> {
        Arc::new(ConfirmCancellationHandler::new(
            self.repository.clone(),
            self.event_publisher.clone(),
        ))
    }

    pub fn process_handler(&self) -> Arc<ProcessCancellationHandler> {
        Arc::new(ProcessCancellationHandler::new(
            self.repository.clone(),
            self.ledger.clone(),
            self.messaging.clone(),
            self.event_publisher.clone(),
            self.processing,
        ))
    }

    pub fn confirm_and_process_handler(&self) -> ConfirmAndProcessHandler {
        ConfirmAndProcessHandler::new(
            self.create_handler(),
            self.update_plan_handler(),
            self.confirm_handler(),
            self.process_handler(),
        )
    }

    pub fn workflow(&self) -> CancellationWorkflow {
        CancellationWorkflow::new(self.impact_handler(), self.preview_handler())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Organizer identity, taken from the `X-User-Id` header set by the
/// upstream auth proxy.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

impl AuthenticatedUser {
    fn metadata(&self, correlation_id: Option<String>) -> CommandMetadata {
        let metadata = CommandMetadata::new(self.user_id.clone()).with_source("http");
        match correlation_id {
            Some(id) => metadata.with_correlation_id(id),
            None => metadata,
        }
    }
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

/// Request context: the caller plus the request id set by the
/// request-id middleware, used as correlation id.
pub struct RequestContext {
    pub user: AuthenticatedUser,
    pub metadata: CommandMetadata,
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        let request_id = parts
            .headers
            .get("X-Request-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let metadata = user.metadata(request_id);

        Ok(RequestContext { user, metadata })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/cancellations/events/:event_id/impact
pub async fn get_impact(
    State(state): State<CancellationAppState>,
    _user: AuthenticatedUser,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse, CancellationApiError> {
    let impact = state
        .impact_handler()
        .handle(CalculateImpactQuery { event_id })
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(impact))
}

/// GET /api/cancellations/:id
pub async fn get_cancellation(
    State(state): State<CancellationAppState>,
    _user: AuthenticatedUser,
    Path(cancellation_id): Path<CancellationId>,
) -> Result<impl IntoResponse, CancellationApiError> {
    let cancellation = state
        .get_handler()
        .handle(GetCancellationQuery { cancellation_id })
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(CancellationResponse::from(cancellation)))
}

/// POST /api/cancellations/preview
///
/// Renders the notice from choices alone; nothing is persisted.
pub async fn preview_notification(
    State(state): State<CancellationAppState>,
    _user: AuthenticatedUser,
    Json(request): Json<PreviewNotificationRequest>,
) -> Result<impl IntoResponse, CancellationApiError> {
    let preview = async {
        let assessment = state.impact_handler().assess(request.event_id).await?;
        let plan = CompensationPlanner::build_plan(&assessment.impact, &request.compensation)?;
        let draft = CancellationDraft {
            event_id: assessment.event.id,
            event_title: assessment.event.title.clone(),
            reason: request.reason,
            reason_note: request.reason_note,
            impact: assessment.impact,
            plan,
        };
        state
            .preview_handler()
            .handle(PreviewNotificationQuery { draft })
            .await
    }
    .await
    .map_err(|e| state.api_error(e))?;

    Ok(Json(preview))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/cancellations
pub async fn create_cancellation(
    State(state): State<CancellationAppState>,
    ctx: RequestContext,
    Json(request): Json<CreateCancellationRequest>,
) -> Result<impl IntoResponse, CancellationApiError> {
    let cmd = CreateCancellationCommand {
        event_id: request.event_id,
        reason: request.reason,
        reason_note: request.reason_note,
    };

    let cancellation = state
        .create_handler()
        .handle(cmd, ctx.metadata)
        .await
        .map_err(|e| state.api_error(e))?;

    Ok((StatusCode::CREATED, Json(CancellationResponse::from(cancellation))))
}

/// PUT /api/cancellations/:id/plan
pub async fn update_plan(
    State(state): State<CancellationAppState>,
    ctx: RequestContext,
    Path(cancellation_id): Path<CancellationId>,
    Json(request): Json<crate::domain::cancellation::CompensationRequest>,
) -> Result<impl IntoResponse, CancellationApiError> {
    let cmd = UpdateCompensationPlanCommand {
        cancellation_id,
        request,
    };

    let cancellation = state
        .update_plan_handler()
        .handle(cmd, ctx.metadata)
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(CancellationResponse::from(cancellation)))
}

/// POST /api/cancellations/:id/confirm
pub async fn confirm_cancellation(
    State(state): State<CancellationAppState>,
    ctx: RequestContext,
    Path(cancellation_id): Path<CancellationId>,
    Json(request): Json<ConfirmCancellationRequest>,
) -> Result<impl IntoResponse, CancellationApiError> {
    let cmd = ConfirmCancellationCommand {
        cancellation_id,
        confirmation_code: request.confirmation_code,
    };

    let cancellation = state
        .confirm_handler()
        .handle(cmd, ctx.metadata)
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(CancellationResponse::from(cancellation)))
}

/// POST /api/cancellations/:id/process
///
/// Runs (or retries) processing and returns the outcome together with the
/// ordered progress log.
pub async fn process_cancellation(
    State(state): State<CancellationAppState>,
    ctx: RequestContext,
    Path(cancellation_id): Path<CancellationId>,
) -> Result<impl IntoResponse, CancellationApiError> {
    let handler = state.process_handler();
    let (reporter, progress) = ProgressReporter::channel(state.progress_capacity);
    let metadata = ctx.metadata;

    let run = tokio::spawn(async move {
        handler
            .handle(ProcessCancellationCommand { cancellation_id }, metadata, reporter)
            .await
    });

    let (outcome, progress) = collect(run, progress).await;
    let result = outcome.map_err(|e| state.api_error(e))?;

    Ok(Json(process_response(result, progress)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Wizard Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/cancellations/wizard
pub async fn start_wizard(
    State(state): State<CancellationAppState>,
    _user: AuthenticatedUser,
    Json(request): Json<StartWizardRequest>,
) -> impl IntoResponse {
    let wizard = state.workflow().start(request.event_id);
    (StatusCode::CREATED, Json(WizardResponse::from(wizard)))
}

/// POST /api/cancellations/wizard/advance
pub async fn advance_wizard(
    State(state): State<CancellationAppState>,
    _user: AuthenticatedUser,
    Json(request): Json<WizardRequest>,
) -> Result<impl IntoResponse, CancellationApiError> {
    let wizard = state
        .workflow()
        .advance(request.wizard)
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(WizardResponse::from(wizard)))
}

/// POST /api/cancellations/wizard/back
pub async fn wizard_back(
    State(state): State<CancellationAppState>,
    _user: AuthenticatedUser,
    Json(request): Json<WizardRequest>,
) -> Result<impl IntoResponse, CancellationApiError> {
    let wizard = state
        .workflow()
        .go_back(request.wizard)
        .map_err(|e| state.api_error(e))?;

    Ok(Json(WizardResponse::from(wizard)))
}

/// PUT /api/cancellations/wizard/compensation
pub async fn wizard_compensation(
    State(state): State<CancellationAppState>,
    _user: AuthenticatedUser,
    Json(request): Json<WizardCompensationRequest>,
) -> Result<impl IntoResponse, CancellationApiError> {
    let wizard = state
        .workflow()
        .update_compensation(request.wizard, request.compensation)
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(WizardResponse::from(wizard)))
}

/// POST /api/cancellations/wizard/submit
///
/// Creates, plans, confirms and processes in one call.
pub async fn submit_wizard(
    State(state): State<CancellationAppState>,
    ctx: RequestContext,
    Json(request): Json<WizardRequest>,
) -> Result<impl IntoResponse, CancellationApiError> {
    let handler = state.confirm_and_process_handler();
    let (reporter, progress) = ProgressReporter::channel(state.progress_capacity);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let _cancel_on_drop = CancelOnDrop(cancel_tx);
    let metadata = ctx.metadata;

    let run = tokio::spawn(async move {
        handler
            .handle(
                ConfirmAndProcessCommand {
                    wizard: request.wizard,
                },
                metadata,
                reporter,
                cancel_rx,
            )
            .await
    });

    let (outcome, progress) = collect(run, progress).await;
    let result = outcome.map_err(|e| state.api_error(e))?;

    Ok((StatusCode::CREATED, Json(process_response(result, progress))))
}

/// Signals cancellation when the request future is dropped.
struct CancelOnDrop(watch::Sender<bool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        // Ignored once the task finished and dropped its receiver
        let _ = self.0.send(true);
    }
}

/// Drains progress while the task runs, then joins it.
async fn collect(
    run: tokio::task::JoinHandle<Result<ProcessCancellationResult, CancellationError>>,
    mut progress: mpsc::Receiver<CancellationProgress>,
) -> (
    Result<ProcessCancellationResult, CancellationError>,
    Vec<CancellationProgress>,
) {
    let mut log = Vec::new();
    while let Some(update) = progress.recv().await {
        log.push(update);
    }

    let outcome = match run.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Processing task panicked");
            Err(CancellationError::collaborator("processing task", e.to_string()))
        }
    };
    (outcome, log)
}

fn process_response(
    result: ProcessCancellationResult,
    progress: Vec<CancellationProgress>,
) -> ProcessCancellationResponse {
    ProcessCancellationResponse {
        cancellation: CancellationResponse::from(result.cancellation),
        results: result.results,
        progress,
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

impl CancellationAppState {
    fn api_error(&self, err: CancellationError) -> CancellationApiError {
        CancellationApiError {
            error: err,
            verbose: self.verbose_errors,
        }
    }
}

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct CancellationApiError {
    error: CancellationError,
    verbose: bool,
}

impl From<CancellationError> for CancellationApiError {
    fn from(error: CancellationError) -> Self {
        Self {
            error,
            verbose: true,
        }
    }
}

impl CancellationApiError {
    pub fn status(&self) -> StatusCode {
        match &self.error {
            CancellationError::EventNotFound(_) | CancellationError::CancellationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            CancellationError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CancellationError::ProcessorUnavailable(_) | CancellationError::Collaborator { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            err => match err.category() {
                ErrorCategory::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCategory::Authorization => StatusCode::FORBIDDEN,
                ErrorCategory::Consistency => StatusCode::CONFLICT,
                ErrorCategory::Transient | ErrorCategory::Catastrophic => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
        }
    }
}

impl IntoResponse for CancellationApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error_code = self.error.code().to_string();

        let hide = !self.verbose
            && matches!(
                self.error,
                CancellationError::Persistence(_) | CancellationError::Collaborator { .. }
            );
        let message = if hide {
            "A required service is unavailable; try again later".to_string()
        } else {
            self.error.message()
        };

        if status.is_server_error() {
            tracing::error!(error_code = %error_code, error = %self.error, "Request failed");
        }

        let body = ErrorResponse::with_details(
            error_code,
            message,
            serde_json::json!({ "retryable": self.error.is_retryable() }),
        );
        (status, Json(body)).into_response()
    }
}
