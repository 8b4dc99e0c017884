//! Cancellation repository port (write side).
//!
//! Persists `EventCancellation` aggregates with optimistic concurrency.
//!
//! # Example
//!
//! ```ignore
//! let expected = cancellation.bump_version();
//! repo.update(&cancellation, expected).await?;
//! ```

use async_trait::async_trait;

use crate::domain::cancellation::EventCancellation;
use crate::domain::foundation::{CancellationId, DomainError, EventId};

/// Repository port for EventCancellation persistence.
///
/// Implementations must ensure:
/// - `update` succeeds only if the stored version equals `expected_version`
/// - the stored version afterwards equals `cancellation.version`
/// - at most one cancellation per event is active (past `Pending`); the
///   check and the write are atomic
#[async_trait]
pub trait CancellationRepository: Send + Sync {
    /// Save a new cancellation.
    ///
    /// # Errors
    ///
    /// - `ConcurrentModification` if the id already exists
    /// - `DatabaseError` on persistence failure
    async fn save(&self, cancellation: &EventCancellation) -> Result<(), DomainError>;

    /// Replace a stored cancellation.
    ///
    /// # Errors
    ///
    /// - `CancellationNotFound` if it doesn't exist
    /// - `ConcurrentModification` if the stored version is not `expected_version`
    /// - `CancellationInProgress` if the write would activate a second
    ///   cancellation of the same event; details carry `event_id` and
    ///   `active_cancellation_id`
    /// - `DatabaseError` on persistence failure
    async fn update(
        &self,
        cancellation: &EventCancellation,
        expected_version: u64,
    ) -> Result<(), DomainError>;

    /// Find a cancellation by its ID.
    async fn find_by_id(&self, id: &CancellationId) -> Result<Option<EventCancellation>, DomainError>;

    /// All cancellations for an event, oldest first.
    async fn find_by_event_id(&self, event_id: &EventId) -> Result<Vec<EventCancellation>, DomainError>;
}
