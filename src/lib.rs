//! Event Cancellation - organizer-driven event cancellation workflow
//!
//! This crate assesses the impact of cancelling an event, builds the
//! attendee compensation plan, confirms the decision and then processes
//! refunds and notifications with progress reporting.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
