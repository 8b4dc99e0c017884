//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, errors and the event envelope
//! that form the vocabulary of the cancellation domain.

mod command;
mod errors;
mod events;
mod ids;
mod money;
mod rate;
mod state_machine;
mod timestamp;

pub use command::CommandMetadata;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    DomainEvent, DomainEventId, EventEnvelope, EventMetadata, SerializableDomainEvent,
};
pub use ids::{CancellationId, EventId, TicketId, TicketTypeId, UserId};
pub use money::Money;
pub use rate::Rate;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
