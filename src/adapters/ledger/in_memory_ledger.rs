//! In-memory payment ledger.
//!
//! Holds sold tickets per event and executes refunds in memory. Supports:
//! - Deterministic seeding from an event's ticket types
//! - Per-ticket error injection
//! - Simulated processor outages (immediately or after N refunds)
//! - Bounded request tracking for assertions

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::cancellation::RefundChannel;
use crate::domain::catalog::{Attendee, Event, PaymentDistribution, PaymentMethod, SoldTicket};
use crate::domain::foundation::{DomainError, EventId, TicketId, Timestamp, UserId};
use crate::ports::{PaymentError, PaymentLedger, RefundReceipt, RefundRequest};

/// Refund requests kept for inspection; older ones are dropped.
const TRACKED_REQUESTS: usize = 10_000;

/// Payment methods assigned round-robin by `seed_for_event`.
const SEED_METHODS: [PaymentMethod; 4] = [
    PaymentMethod::Card,
    PaymentMethod::EWallet,
    PaymentMethod::BankTransfer,
    PaymentMethod::Cash,
];

/// In-memory payment ledger.
///
/// # Example
///
/// ```ignore
/// let ledger = InMemoryPaymentLedger::new();
/// ledger.seed_for_event(&event);
///
/// // Inject failures
/// ledger.fail_ticket(ticket_id, PaymentError::declined("card expired"));
/// ledger.fail_after(5);
///
/// let receipt = ledger.refund(request).await?;
/// ```
#[derive(Clone, Default)]
pub struct InMemoryPaymentLedger {
    inner: Arc<Mutex<LedgerState>>,
}

#[derive(Default)]
struct LedgerState {
    /// Sold tickets per event, in purchase order.
    tickets: HashMap<EventId, Vec<SoldTicket>>,

    /// Issued receipts by idempotency key.
    receipts: HashMap<String, RefundReceipt>,

    /// Errors returned for specific tickets.
    ticket_errors: HashMap<TicketId, PaymentError>,

    /// Every refund call returns `ProcessorUnavailable` while set.
    outage: Option<String>,

    /// Outage starts after this many new receipts.
    fail_after: Option<usize>,

    /// Latest refund requests received, including rejected ones.
    requests: VecDeque<RefundRequest>,

    next_reference: u64,
}

impl InMemoryPaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Records tickets sold for an event.
    pub fn add_tickets(&self, event_id: EventId, tickets: Vec<SoldTicket>) {
        self.state()
            .tickets
            .entry(event_id)
            .or_default()
            .extend(tickets);
    }

    /// Creates one sold ticket per `sold` seat of every ticket type.
    ///
    /// Holders are `attendee-1..n` and payment methods rotate through card,
    /// e-wallet, bank transfer and cash. Each ticket is paid at its type's
    /// price.
    pub fn seed_for_event(&self, event: &Event) -> Vec<SoldTicket> {
        let mut tickets = Vec::new();
        let mut n = 0usize;

        for ticket_type in &event.ticket_types {
            for _ in 0..ticket_type.sold {
                n += 1;
                let holder = format!("attendee-{}", n);
                let Ok(user_id) = UserId::new(holder.clone()) else {
                    continue;
                };
                tickets.push(SoldTicket {
                    id: TicketId::new(),
                    ticket_type_id: ticket_type.id,
                    holder: Attendee {
                        user_id,
                        name: format!("Attendee {}", n),
                        email: format!("{}@example.com", holder),
                    },
                    payment_method: SEED_METHODS[(n - 1) % SEED_METHODS.len()],
                    amount_paid: ticket_type.price,
                });
            }
        }

        self.add_tickets(event.id, tickets.clone());
        tickets
    }

    /// Makes refunds of one ticket fail with `error`.
    pub fn fail_ticket(&self, ticket_id: TicketId, error: PaymentError) {
        self.state().ticket_errors.insert(ticket_id, error);
    }

    /// Simulates the processor going down.
    pub fn set_unavailable(&self, reason: impl Into<String>) {
        self.state().outage = Some(reason.into());
    }

    /// Simulates an outage that begins after `n` more successful refunds.
    pub fn fail_after(&self, n: usize) {
        let mut state = self.state();
        let issued = state.receipts.len();
        state.fail_after = Some(issued + n);
    }

    /// Clears outages and per-ticket errors.
    pub fn restore(&self) {
        let mut state = self.state();
        state.outage = None;
        state.fail_after = None;
        state.ticket_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Latest refund requests received, in arrival order.
    pub fn refund_requests(&self) -> Vec<RefundRequest> {
        self.state().requests.iter().cloned().collect()
    }

    /// Number of distinct refunds issued.
    pub fn receipt_count(&self) -> usize {
        self.state().receipts.len()
    }

    fn issue_receipt(state: &mut LedgerState, request: &RefundRequest) -> RefundReceipt {
        state.next_reference += 1;
        let prefix = match request.channel {
            RefundChannel::Automatic => "rf",
            RefundChannel::Manual => "manual",
        };
        RefundReceipt {
            reference: format!("{}_{:06}", prefix, state.next_reference),
            ticket_id: request.ticket_id,
            amount: request.amount,
            processed_at: Timestamp::now(),
        }
    }
}

#[async_trait]
impl PaymentLedger for InMemoryPaymentLedger {
    async fn payment_distribution(&self, event_id: &EventId) -> Result<PaymentDistribution, DomainError> {
        let state = self.state();
        let tickets = state.tickets.get(event_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(PaymentDistribution::from_tickets(tickets))
    }

    async fn sold_tickets(&self, event_id: &EventId) -> Result<Vec<SoldTicket>, DomainError> {
        Ok(self.state().tickets.get(event_id).cloned().unwrap_or_default())
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundReceipt, PaymentError> {
        let mut state = self.state();
        if state.requests.len() == TRACKED_REQUESTS {
            state.requests.pop_front();
        }
        state.requests.push_back(request.clone());

        if let Some(reason) = &state.outage {
            return Err(PaymentError::processor_unavailable(reason.clone()));
        }

        if let Some(receipt) = state.receipts.get(&request.idempotency_key) {
            return Ok(receipt.clone());
        }

        if let Some(error) = state.ticket_errors.get(&request.ticket_id) {
            return Err(error.clone());
        }

        if let Some(limit) = state.fail_after {
            if state.receipts.len() >= limit {
                let reason = "payment processor stopped responding".to_string();
                state.outage = Some(reason.clone());
                return Err(PaymentError::processor_unavailable(reason));
            }
        }

        let receipt = Self::issue_receipt(&mut state, &request);
        state
            .receipts
            .insert(request.idempotency_key.clone(), receipt.clone());

        tracing::debug!(
            ticket_id = %request.ticket_id,
            amount = %request.amount,
            reference = %receipt.reference,
            "Refund issued"
        );
        Ok(receipt)
    }
}
