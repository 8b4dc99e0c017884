//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, events)
//! - `catalog` - Read models owned by the event catalog and payment ledger
//! - `cancellation` - Event cancellation workflow: impact, compensation,
//!   notification, lifecycle

pub mod cancellation;
pub mod catalog;
pub mod foundation;
