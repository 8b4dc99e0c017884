//! In-memory event catalog.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::domain::catalog::Event;
use crate::domain::foundation::{DomainError, EventId};
use crate::ports::EventCatalog;

/// Catalog of events kept in process memory.
#[derive(Default)]
pub struct InMemoryEventCatalog {
    events: RwLock<HashMap<EventId, Event>>,
}

impl InMemoryEventCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an event.
    pub fn add_event(&self, event: Event) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event.id, event);
    }

    /// Flags the event as cancelled. Returns false for unknown events.
    pub fn mark_cancelled(&self, event_id: &EventId) -> bool {
        match self
            .events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(event_id)
        {
            Some(event) => {
                event.is_cancelled = true;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl EventCatalog for InMemoryEventCatalog {
    async fn get_event(&self, event_id: &EventId) -> Result<Option<Event>, DomainError> {
        Ok(self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_id)
            .cloned())
    }
}
