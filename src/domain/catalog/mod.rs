//! Event catalog types.
//!
//! These are read-only inputs owned by the external event catalog and
//! payment ledger. The cancellation workflow never mutates them.

mod event;
mod payment;

pub use event::{Event, TicketType};
pub use payment::{Attendee, PaymentDistribution, PaymentMethod, PaymentMethodCount, SoldTicket};
