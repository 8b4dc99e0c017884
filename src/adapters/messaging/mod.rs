//! Messaging adapters for attendee notifications.

mod in_memory_messaging;

pub use in_memory_messaging::{InMemoryMessagingProvider, SentMessage};
