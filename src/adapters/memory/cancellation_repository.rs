//! In-memory cancellation repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::cancellation::EventCancellation;
use crate::domain::foundation::{CancellationId, DomainError, ErrorCode, EventId};
use crate::ports::CancellationRepository;

/// Stores cancellations in a map guarded by a single mutex.
///
/// The version check, the one-active-per-event check and the write happen
/// under the same lock, so two writers holding the same snapshot cannot both
/// succeed and two drafts of one event cannot both be confirmed.
#[derive(Default)]
pub struct InMemoryCancellationRepository {
    state: Mutex<RepositoryState>,
}

#[derive(Default)]
struct RepositoryState {
    cancellations: HashMap<CancellationId, EventCancellation>,

    /// Successful updates left before the next one fails.
    fail_update_after: Option<usize>,
}

impl InMemoryCancellationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RepositoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes one `update` fail with `DatabaseError` after `n` more succeed.
    pub fn fail_update_after(&self, n: usize) {
        self.state().fail_update_after = Some(n);
    }

    pub fn len(&self) -> usize {
        self.state().cancellations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CancellationRepository for InMemoryCancellationRepository {
    async fn save(&self, cancellation: &EventCancellation) -> Result<(), DomainError> {
        let mut state = self.state();
        let cancellations = &mut state.cancellations;

        if cancellations.contains_key(&cancellation.id) {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!("Cancellation already exists: {}", cancellation.id),
            ));
        }

        cancellations.insert(cancellation.id, cancellation.clone());
        Ok(())
    }

    async fn update(
        &self,
        cancellation: &EventCancellation,
        expected_version: u64,
    ) -> Result<(), DomainError> {
        let mut state = self.state();

        match state.fail_update_after {
            Some(0) => {
                state.fail_update_after = None;
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    "injected update failure",
                ));
            }
            Some(n) => state.fail_update_after = Some(n - 1),
            None => {}
        }

        if cancellation.status.is_active() {
            let rival = state.cancellations.values().find(|c| {
                c.event_id == cancellation.event_id
                    && c.id != cancellation.id
                    && c.status.is_active()
            });
            if let Some(rival) = rival {
                return Err(DomainError::new(
                    ErrorCode::CancellationInProgress,
                    format!(
                        "Event {} already has active cancellation {}",
                        cancellation.event_id, rival.id
                    ),
                )
                .with_detail("event_id", cancellation.event_id.to_string())
                .with_detail("active_cancellation_id", rival.id.to_string()));
            }
        }

        let stored = state.cancellations.get_mut(&cancellation.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::CancellationNotFound,
                format!("Cancellation not found: {}", cancellation.id),
            )
        })?;

        if stored.version != expected_version {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Cancellation {} is at version {}, expected {}",
                    cancellation.id, stored.version, expected_version
                ),
            )
            .with_detail("stored_version", stored.version.to_string()));
        }

        *stored = cancellation.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &CancellationId) -> Result<Option<EventCancellation>, DomainError> {
        Ok(self.state().cancellations.get(id).cloned())
    }

    async fn find_by_event_id(&self, event_id: &EventId) -> Result<Vec<EventCancellation>, DomainError> {
        let mut found: Vec<EventCancellation> = self
            .state()
            .cancellations
            .values()
            .filter(|c| c.event_id == *event_id)
            .cloned()
            .collect();
        found.sort_by_key(|c| c.created_at);
        Ok(found)
    }
}
