//! EventSubscriber port - reacting to published cancellation events.
//!
//! Consumers such as the event catalog register for event types and are
//! invoked after publication, without knowing the transport.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Handler for published domain events.
///
/// Handlers must be idempotent: delivery is at-least-once.
///
/// # Example
///
/// ```ignore
/// #[async_trait]
/// impl EventHandler for CatalogCancellationListener {
///     async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
///         let payload: CancellationEvent = event.payload_as()?;
///         self.catalog.mark_cancelled(&payload.event_id);
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "CatalogCancellationListener"
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name used in logs and error messages.
    fn name(&self) -> &'static str;
}

/// Port for subscribing to domain events.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe handler to a specific event type.
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    /// Subscribe the same handler to several event types.
    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>);
}
