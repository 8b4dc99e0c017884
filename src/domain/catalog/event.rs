//! Ticketed event and its ticket types.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, Money, TicketTypeId, Timestamp, UserId};

/// A ticket type offered by an event (e.g. "General", "VIP").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketType {
    pub id: TicketTypeId,
    pub name: String,
    pub price: Money,
    /// Capacity; ignored when `is_unlimited` is set.
    pub quantity: u32,
    pub sold: u32,
    #[serde(default)]
    pub is_unlimited: bool,
}

impl TicketType {
    /// Creates a ticket type with a fixed capacity.
    pub fn new(name: impl Into<String>, price: Money, quantity: u32, sold: u32) -> Self {
        Self {
            id: TicketTypeId::new(),
            name: name.into(),
            price,
            quantity,
            sold,
            is_unlimited: false,
        }
    }

    /// Creates a ticket type without a capacity limit.
    pub fn unlimited(name: impl Into<String>, price: Money, sold: u32) -> Self {
        Self {
            id: TicketTypeId::new(),
            name: name.into(),
            price,
            quantity: 0,
            sold,
            is_unlimited: true,
        }
    }

    /// Revenue collected for this type (`sold × price`).
    pub fn revenue(&self) -> Money {
        self.price.times(self.sold)
    }

    /// True when a capped type has no seats left.
    pub fn is_sold_out(&self) -> bool {
        !self.is_unlimited && self.quantity > 0 && self.sold >= self.quantity
    }
}

/// A ticketed event as published by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub organizer_id: UserId,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub venue: String,
    pub ticket_types: Vec<TicketType>,
    /// Set by the catalog once a cancellation has been applied.
    #[serde(default)]
    pub is_cancelled: bool,
}

impl Event {
    /// Total tickets sold across all types.
    pub fn tickets_sold(&self) -> u32 {
        self.ticket_types.iter().map(|t| t.sold).sum()
    }

    /// Total revenue across all types.
    pub fn gross_revenue(&self) -> Money {
        self.ticket_types.iter().map(TicketType::revenue).sum()
    }

    pub fn is_organized_by(&self, user_id: &UserId) -> bool {
        self.organizer_id == *user_id
    }
}
