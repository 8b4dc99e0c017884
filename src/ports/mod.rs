//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Collaborator Ports
//!
//! - `EventCatalog` - Read access to ticketed events
//! - `PaymentLedger` - Sold tickets, payment distribution and refunds
//! - `MessagingProvider` - Attendee notification delivery
//!
//! ## Persistence and Events
//!
//! - `CancellationRepository` - EventCancellation storage with optimistic concurrency
//! - `EventPublisher` - Port for publishing domain events
//! - `EventSubscriber` / `EventHandler` - Reacting to published events

mod cancellation_repository;
mod event_catalog;
mod event_publisher;
mod event_subscriber;
mod messaging_provider;
mod payment_ledger;

pub use cancellation_repository::CancellationRepository;
pub use event_catalog::EventCatalog;
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventHandler, EventSubscriber};
pub use messaging_provider::{MessagingError, MessagingProvider};
pub use payment_ledger::{
    PaymentError, PaymentErrorCode, PaymentLedger, RefundKind, RefundReceipt, RefundRequest,
};
