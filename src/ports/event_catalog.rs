//! Event catalog port (read side).
//!
//! The catalog owns events and their ticket types. The cancellation
//! workflow only reads from it; marking an event as cancelled happens
//! downstream in response to `cancellation.completed` events.

use async_trait::async_trait;

use crate::domain::catalog::Event;
use crate::domain::foundation::{DomainError, EventId};

/// Port for looking up ticketed events.
///
/// Implementations must return the current `sold` counts for every ticket
/// type at call time.
#[async_trait]
pub trait EventCatalog: Send + Sync {
    /// Find an event by id.
    ///
    /// Returns `None` if the catalog has no such event.
    async fn get_event(&self, event_id: &EventId) -> Result<Option<Event>, DomainError>;
}
