//! Payment ledger port.
//!
//! The ledger knows who bought which ticket and how they paid, and executes
//! refunds against the original payment rails.
//!
//! # Design
//!
//! - **Idempotent refunds**: every request carries an idempotency key
//!   derived from the cancellation and ticket, so a retried batch never
//!   refunds a ticket twice
//! - **Catastrophic vs per-item**: only `ProcessorUnavailable` means the
//!   whole batch should stop

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::cancellation::{CompensationType, RefundChannel};
use crate::domain::catalog::{PaymentDistribution, PaymentMethod, SoldTicket};
use crate::domain::foundation::{
    CancellationId, DomainError, ErrorCode, EventId, Money, TicketId, Timestamp,
};

/// Port for the payment ledger.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Distribution of the event's sold tickets across payment methods.
    async fn payment_distribution(&self, event_id: &EventId) -> Result<PaymentDistribution, DomainError>;

    /// All tickets sold for the event, in purchase order.
    async fn sold_tickets(&self, event_id: &EventId) -> Result<Vec<SoldTicket>, DomainError>;

    /// Refund one ticket.
    ///
    /// Repeating a request with the same idempotency key returns the
    /// original receipt.
    async fn refund(&self, request: RefundRequest) -> Result<RefundReceipt, PaymentError>;
}

/// How the refund is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundKind {
    /// Money back to the original payment method.
    OriginalPayment,
    /// Credit usable for future events.
    EventCredit,
}

impl From<CompensationType> for RefundKind {
    fn from(compensation: CompensationType) -> Self {
        match compensation {
            CompensationType::FullRefund | CompensationType::PartialRefund => {
                RefundKind::OriginalPayment
            }
            CompensationType::EventCredit => RefundKind::EventCredit,
        }
    }
}

/// Request to refund one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Stable across retries and across cancellations of the same event.
    pub idempotency_key: String,
    pub cancellation_id: CancellationId,
    pub ticket_id: TicketId,
    pub amount: Money,
    pub kind: RefundKind,
    pub channel: RefundChannel,
    pub payment_method: PaymentMethod,
}

impl RefundRequest {
    /// Idempotency key for refunding a ticket of an event. A ticket is
    /// refunded at most once however many cancellations reach the ledger.
    pub fn idempotency_key_for(event_id: &EventId, ticket_id: &TicketId) -> String {
        format!("event-{}-ticket-{}", event_id, ticket_id)
    }
}

/// Proof of a refund (or a queued manual refund).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReceipt {
    /// Ledger's reference.
    pub reference: String,
    pub ticket_id: TicketId,
    pub amount: Money,
    pub processed_at: Timestamp,
}

/// Errors from payment ledger operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Processor's own error code, if it gave one.
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Declined, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn processor_unavailable(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProcessorUnavailable, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    /// True if the whole refund batch must stop.
    pub fn is_catastrophic(&self) -> bool {
        self.code == PaymentErrorCode::ProcessorUnavailable
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::ProcessorUnavailable => ErrorCode::ProcessorUnavailable,
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            PaymentErrorCode::Declined | PaymentErrorCode::AlreadyRefunded => {
                ErrorCode::PaymentFailed
            }
            _ => ErrorCode::ExternalServiceError,
        };

        DomainError::new(code, err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Processor refused the refund.
    Declined,

    /// Ticket was refunded outside this cancellation.
    AlreadyRefunded,

    /// Ticket or payment unknown to the processor.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Network connectivity issue for this call.
    NetworkError,

    /// Processor cannot be reached at all.
    ProcessorUnavailable,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProcessorUnavailable
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::Declined => "declined",
            PaymentErrorCode::AlreadyRefunded => "already_refunded",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::ProcessorUnavailable => "processor_unavailable",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_ledger_is_object_safe() {
        fn _accepts_dyn(_ledger: &dyn PaymentLedger) {}
    }

    #[test]
    fn payment_error_retryable() {
        assert!(PaymentErrorCode::NetworkError.is_retryable());
        assert!(PaymentErrorCode::RateLimitExceeded.is_retryable());
        assert!(PaymentErrorCode::ProcessorUnavailable.is_retryable());

        assert!(!PaymentErrorCode::Declined.is_retryable());
        assert!(!PaymentErrorCode::AlreadyRefunded.is_retryable());
    }

    #[test]
    fn only_processor_unavailable_is_catastrophic() {
        assert!(PaymentError::processor_unavailable("gateway down").is_catastrophic());
        assert!(!PaymentError::network("reset by peer").is_catastrophic());
        assert!(!PaymentError::declined("card closed").is_catastrophic());
    }

    #[test]
    fn payment_error_display() {
        let err = PaymentError::declined("Card closed").with_provider_code("do_not_honor");
        assert_eq!(err.to_string(), "declined: Card closed");
        assert_eq!(err.provider_code.as_deref(), Some("do_not_honor"));
    }

    #[test]
    fn payment_error_converts_to_domain_error() {
        let domain_err: DomainError = PaymentError::processor_unavailable("down").into();
        assert_eq!(domain_err.code, ErrorCode::ProcessorUnavailable);
    }

    #[test]
    fn idempotency_key_is_scoped_to_event_and_ticket() {
        let e = EventId::new();
        let t = TicketId::new();
        assert_eq!(
            RefundRequest::idempotency_key_for(&e, &t),
            format!("event-{}-ticket-{}", e, t)
        );
        assert_ne!(
            RefundRequest::idempotency_key_for(&e, &t),
            RefundRequest::idempotency_key_for(&e, &TicketId::new())
        );
    }

    #[test]
    fn credit_compensation_maps_to_credit_refunds() {
        assert_eq!(RefundKind::from(CompensationType::EventCredit), RefundKind::EventCredit);
        assert_eq!(RefundKind::from(CompensationType::PartialRefund), RefundKind::OriginalPayment);
    }
}
