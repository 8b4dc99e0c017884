//! Payment ledger read models: sold tickets and payment-method distribution.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Money, TicketId, TicketTypeId, UserId};

/// How an attendee paid for a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    EWallet,
    BankTransfer,
    Cash,
    Other,
}

impl PaymentMethod {
    /// All methods in breakdown order.
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Card,
        PaymentMethod::EWallet,
        PaymentMethod::BankTransfer,
        PaymentMethod::Cash,
        PaymentMethod::Other,
    ];

    /// Methods whose refunds cannot be pushed back through the original rail.
    pub fn requires_manual_refund(&self) -> bool {
        matches!(self, PaymentMethod::BankTransfer | PaymentMethod::Cash)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "Card",
            PaymentMethod::EWallet => "E-wallet",
            PaymentMethod::BankTransfer => "Bank transfer",
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Other => "Other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The holder of a ticket, i.e. a notification recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

/// A ticket sold for an event, as recorded by the payment ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoldTicket {
    pub id: TicketId,
    pub ticket_type_id: TicketTypeId,
    pub holder: Attendee,
    pub payment_method: PaymentMethod,
    pub amount_paid: Money,
}

/// Ticket count for one payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodCount {
    pub method: PaymentMethod,
    pub ticket_count: u32,
}

/// Distribution of an event's sold tickets across payment methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDistribution {
    pub by_method: Vec<PaymentMethodCount>,
    /// Distinct ticket holders.
    pub attendees_count: u32,
}

impl PaymentDistribution {
    /// Builds a distribution from the ledger's sold tickets.
    pub fn from_tickets(tickets: &[SoldTicket]) -> Self {
        let by_method = PaymentMethod::ALL
            .iter()
            .map(|method| PaymentMethodCount {
                method: *method,
                ticket_count: tickets
                    .iter()
                    .filter(|t| t.payment_method == *method)
                    .count() as u32,
            })
            .filter(|c| c.ticket_count > 0)
            .collect();

        let mut holders: Vec<&UserId> = tickets.iter().map(|t| &t.holder.user_id).collect();
        holders.sort();
        holders.dedup();

        Self {
            by_method,
            attendees_count: holders.len() as u32,
        }
    }

    /// Total tickets represented.
    pub fn total(&self) -> u32 {
        self.by_method.iter().map(|c| c.ticket_count).sum()
    }
}
