//! Applies completed cancellations to the in-memory catalog.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::cancellation::{CancellationEvent, CancellationEventKind};
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventHandler;

use super::InMemoryEventCatalog;

/// Event type this listener reacts to.
pub const CANCELLATION_COMPLETED: &str = "cancellation.completed.v1";

/// Marks the catalog event as cancelled once its cancellation completes.
///
/// Replays are harmless: the flag is simply set again.
pub struct CatalogCancellationListener {
    catalog: Arc<InMemoryEventCatalog>,
}

impl CatalogCancellationListener {
    pub fn new(catalog: Arc<InMemoryEventCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl EventHandler for CatalogCancellationListener {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let payload: CancellationEvent = event.payload_as().map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Malformed cancellation event {}: {}", event.event_id, e),
            )
        })?;

        if !matches!(payload.kind, CancellationEventKind::Completed { .. }) {
            return Ok(());
        }

        if self.catalog.mark_cancelled(&payload.event_id) {
            tracing::info!(event_id = %payload.event_id, "Event marked as cancelled in catalog");
        } else {
            tracing::warn!(event_id = %payload.event_id, "Completed cancellation for unknown event");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "CatalogCancellationListener"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryEventBus;
    use crate::domain::cancellation::ProcessingResults;
    use crate::domain::catalog::Event;
    use crate::domain::foundation::{
        CancellationId, EventId, SerializableDomainEvent, Timestamp, UserId,
    };
    use crate::ports::{EventCatalog, EventPublisher, EventSubscriber};

    #[tokio::test]
    async fn completed_cancellation_marks_event() {
        let catalog = Arc::new(InMemoryEventCatalog::new());
        let event = Event {
            id: EventId::new(),
            title: "Open Air".to_string(),
            organizer_id: UserId::new("organizer-1").unwrap(),
            start_date: Timestamp::now().add_days(3),
            end_date: Timestamp::now().add_days(3),
            venue: "Park".to_string(),
            ticket_types: vec![],
            is_cancelled: false,
        };
        catalog.add_event(event.clone());

        let bus = InMemoryEventBus::new();
        bus.subscribe(
            CANCELLATION_COMPLETED,
            Arc::new(CatalogCancellationListener::new(catalog.clone())),
        );

        let completed = CancellationEvent::new(
            CancellationId::new(),
            event.id,
            CancellationEventKind::Completed {
                results: ProcessingResults::default(),
            },
        );
        bus.publish(completed.to_envelope()).await.unwrap();

        let stored = catalog.get_event(&event.id).await.unwrap().unwrap();
        assert!(stored.is_cancelled);
    }
}
