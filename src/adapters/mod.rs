//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `events` - In-process event bus
//! - `memory` - Cancellation storage and the event catalog
//! - `ledger` - Payment ledger
//! - `messaging` - Attendee notification delivery
//! - `http` - REST API

pub mod events;
pub mod http;
pub mod ledger;
pub mod memory;
pub mod messaging;

pub use events::InMemoryEventBus;
pub use ledger::InMemoryPaymentLedger;
pub use memory::{
    CatalogCancellationListener, InMemoryCancellationRepository, InMemoryEventCatalog,
    CANCELLATION_COMPLETED,
};
pub use messaging::{InMemoryMessagingProvider, SentMessage};
