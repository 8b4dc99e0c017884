//! GetCancellationHandler - Query handler for one cancellation.

use std::sync::Arc;

use crate::domain::cancellation::{CancellationError, EventCancellation};
use crate::domain::foundation::CancellationId;
use crate::ports::CancellationRepository;

use super::support::load;

#[derive(Debug, Clone)]
pub struct GetCancellationQuery {
    pub cancellation_id: CancellationId,
}

pub struct GetCancellationHandler {
    repository: Arc<dyn CancellationRepository>,
}

impl GetCancellationHandler {
    pub fn new(repository: Arc<dyn CancellationRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: GetCancellationQuery) -> Result<EventCancellation, CancellationError> {
        load(self.repository.as_ref(), query.cancellation_id).await
    }
}
