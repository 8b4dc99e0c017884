//! In-memory event bus.
//!
//! Synchronous, in-process delivery. Used by the service binary and by
//! tests, which assert on the captured envelopes.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

/// Envelopes kept for inspection; older ones are dropped.
const DEFAULT_CAPACITY: usize = 10_000;

/// In-memory event bus.
///
/// The latest published envelopes are kept for inspection. Handlers subscribed to
/// the envelope's type run in subscription order before `publish` returns.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.subscribe("cancellation.completed.v1", listener);
///
/// bus.publish(envelope).await?;
/// assert!(bus.has_event("cancellation.completed.v1"));
/// ```
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    published: RwLock<VecDeque<EventEnvelope>>,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Creates a new empty event bus.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus that keeps at most `capacity` envelopes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            published: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Retained envelopes, oldest first.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Published envelopes of one type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Published envelopes for one aggregate.
    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .collect()
    }

    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.event_type == event_type)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        {
            let mut published = self.published.write().unwrap_or_else(PoisonError::into_inner);
            if published.len() == self.capacity {
                published.pop_front();
            }
            published.push_back(event.clone());
        }

        tracing::debug!(
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            "Event published"
        );

        // Lock released before awaiting handlers
        let type_handlers: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers.get(&event.event_type).cloned().unwrap_or_default()
        };

        let mut errors = Vec::new();
        for handler in type_handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                tracing::warn!(handler = handler.name(), error = %e, "Event handler failed");
                errors.push(format!("{}: {}", handler.name(), e));
            }
        }

        if !errors.is_empty() {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Handler errors: {}", errors.join(", ")),
            ));
        }

        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        for event_type in event_types {
            handlers
                .entry(event_type.to_string())
                .or_default()
                .push(Arc::clone(&handler));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cancellation::{CancellationEvent, CancellationEventKind};
    use crate::domain::foundation::{
        CancellationId, EventId, SerializableDomainEvent, UserId,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn envelope(cancellation_id: CancellationId, kind: CancellationEventKind) -> EventEnvelope {
        CancellationEvent::new(cancellation_id, EventId::new(), kind).to_envelope()
    }

    fn confirmed(cancellation_id: CancellationId) -> EventEnvelope {
        envelope(
            cancellation_id,
            CancellationEventKind::Confirmed {
                confirmed_by: UserId::new("organizer-1").unwrap(),
            },
        )
    }

    fn failed(cancellation_id: CancellationId) -> EventEnvelope {
        envelope(
            cancellation_id,
            CancellationEventKind::Failed {
                reason: "processor down".to_string(),
            },
        )
    }

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    #[tokio::test]
    async fn publish_stores_event() {
        let bus = InMemoryEventBus::new();

        bus.publish(confirmed(CancellationId::new())).await.unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("cancellation.confirmed.v1"));
    }

    #[tokio::test]
    async fn keeps_only_the_latest_envelopes() {
        let bus = InMemoryEventBus::with_capacity(2);
        let oldest = CancellationId::new();

        bus.publish(confirmed(oldest)).await.unwrap();
        bus.publish(failed(CancellationId::new())).await.unwrap();
        bus.publish(failed(CancellationId::new())).await.unwrap();

        assert_eq!(bus.event_count(), 2);
        assert!(bus.events_for_aggregate(&oldest.to_string()).is_empty());
        assert!(!bus.has_event("cancellation.confirmed.v1"));
    }

    #[tokio::test]
    async fn filters_by_type_and_aggregate() {
        let bus = InMemoryEventBus::new();
        let first = CancellationId::new();
        let second = CancellationId::new();

        bus.publish(confirmed(first)).await.unwrap();
        bus.publish(failed(second)).await.unwrap();
        bus.publish(failed(first)).await.unwrap();

        assert_eq!(bus.events_of_type("cancellation.failed.v1").len(), 2);
        assert_eq!(bus.events_for_aggregate(&first.to_string()).len(), 2);
    }

    #[tokio::test]
    async fn subscribed_handlers_run_for_matching_type_only() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.subscribe_all(
            &["cancellation.confirmed.v1", "cancellation.completed.v1"],
            Arc::new(CountingHandler(counter.clone())),
        );
        bus.subscribe(
            "cancellation.confirmed.v1",
            Arc::new(CountingHandler(counter.clone())),
        );

        bus.publish(confirmed(CancellationId::new())).await.unwrap();
        bus.publish(failed(CancellationId::new())).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn publish_all_publishes_in_order() {
        let bus = InMemoryEventBus::new();
        let id = CancellationId::new();

        bus.publish_all(vec![confirmed(id), failed(id)]).await.unwrap();

        let types: Vec<String> = bus
            .published_events()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(types, vec!["cancellation.confirmed.v1", "cancellation.failed.v1"]);

        bus.clear();
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn handler_error_is_propagated() {
        let bus = InMemoryEventBus::new();

        struct FailingHandler;

        #[async_trait]
        impl EventHandler for FailingHandler {
            async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
                Err(DomainError::new(ErrorCode::InternalError, "Handler failed"))
            }
            fn name(&self) -> &'static str {
                "FailingHandler"
            }
        }

        bus.subscribe("cancellation.failed.v1", Arc::new(FailingHandler));
        let result = bus.publish(failed(CancellationId::new())).await;

        assert!(result.unwrap_err().message.contains("FailingHandler"));
        assert_eq!(bus.event_count(), 1);
    }
}
