//! Axum router configuration for cancellation endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    advance_wizard, confirm_cancellation, create_cancellation, get_cancellation, get_impact,
    preview_notification, process_cancellation, start_wizard, submit_wizard, update_plan,
    wizard_back, wizard_compensation, CancellationAppState,
};

/// Create the cancellation API router.
///
/// # Routes
///
/// ## Staged API
/// - `GET /events/:event_id/impact` - Impact of cancelling an event
/// - `POST /preview` - Render the attendee notice without persisting
/// - `POST /` - Create a pending cancellation
/// - `GET /:id` - Get cancellation details
/// - `PUT /:id/plan` - Set or replace the compensation plan
/// - `POST /:id/confirm` - Confirm with the typed confirmation text
/// - `POST /:id/process` - Run or retry refunds and notifications
///
/// ## Wizard
/// - `POST /wizard` - Open a wizard for an event
/// - `POST /wizard/advance` - Move to the next step
/// - `POST /wizard/back` - Move to the previous step
/// - `PUT /wizard/compensation` - Change compensation choices
/// - `POST /wizard/submit` - Confirm and process in one call
pub fn cancellation_routes() -> Router<CancellationAppState> {
    Router::new()
        .route("/", post(create_cancellation))
        .route("/preview", post(preview_notification))
        .route("/events/:event_id/impact", get(get_impact))
        .route("/wizard", post(start_wizard))
        .route("/wizard/advance", post(advance_wizard))
        .route("/wizard/back", post(wizard_back))
        .route("/wizard/compensation", put(wizard_compensation))
        .route("/wizard/submit", post(submit_wizard))
        .route("/:id", get(get_cancellation))
        .route("/:id/plan", put(update_plan))
        .route("/:id/confirm", post(confirm_cancellation))
        .route("/:id/process", post(process_cancellation))
}

/// Create the complete cancellation module router, mounted at
/// `/cancellations`.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", cancellation_router())
///     .with_state(app_state);
/// ```
pub fn cancellation_router() -> Router<CancellationAppState> {
    Router::new().nest("/cancellations", cancellation_routes())
}
