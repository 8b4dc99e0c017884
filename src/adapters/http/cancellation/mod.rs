//! HTTP adapter for cancellation endpoints.
//!
//! Exposes the cancellation workflow via REST API under `/api/cancellations`:
//! the staged calls (impact, preview, create, plan, confirm, process) and the
//! wizard calls that drive the same handlers step by step.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{AuthenticatedUser, CancellationApiError, CancellationAppState};
pub use routes::{cancellation_router, cancellation_routes};
