//! In-process storage adapters.
//!
//! - `InMemoryCancellationRepository` - cancellation aggregates with version checks
//! - `InMemoryEventCatalog` - ticketed events
//! - `CatalogCancellationListener` - applies completed cancellations to the catalog

mod cancellation_repository;
mod catalog_listener;
mod event_catalog;

pub use cancellation_repository::InMemoryCancellationRepository;
pub use catalog_listener::{CatalogCancellationListener, CANCELLATION_COMPLETED};
pub use event_catalog::InMemoryEventCatalog;
