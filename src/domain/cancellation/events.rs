//! Cancellation domain events.
//!
//! Published after each successful save so downstream consumers (the event
//! catalog, reporting) can react without coupling to the workflow.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CancellationId, DomainEvent, DomainEventId, EventId, Money, Timestamp, UserId,
};

use super::{CancellationReason, CompensationType, ProcessingResults};

/// What happened to a cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CancellationEventKind {
    Created {
        reason: CancellationReason,
        initiated_by: UserId,
    },
    PlanUpdated {
        compensation_type: CompensationType,
        total_refund_amount: Money,
    },
    Confirmed {
        confirmed_by: UserId,
    },
    ProcessingStarted {
        attempt: u32,
    },
    /// Downstream catalogs mark the event as cancelled on this.
    Completed {
        results: ProcessingResults,
    },
    Failed {
        reason: String,
    },
}

/// Event emitted by the `EventCancellation` aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationEvent {
    pub id: DomainEventId,
    pub cancellation_id: CancellationId,
    pub event_id: EventId,
    pub occurred_at: Timestamp,
    #[serde(flatten)]
    pub kind: CancellationEventKind,
}

impl CancellationEvent {
    pub fn new(cancellation_id: CancellationId, event_id: EventId, kind: CancellationEventKind) -> Self {
        Self {
            id: DomainEventId::new(),
            cancellation_id,
            event_id,
            occurred_at: Timestamp::now(),
            kind,
        }
    }
}

impl DomainEvent for CancellationEvent {
    fn event_type(&self) -> &'static str {
        match self.kind {
            CancellationEventKind::Created { .. } => "cancellation.created.v1",
            CancellationEventKind::PlanUpdated { .. } => "cancellation.plan_updated.v1",
            CancellationEventKind::Confirmed { .. } => "cancellation.confirmed.v1",
            CancellationEventKind::ProcessingStarted { .. } => "cancellation.processing_started.v1",
            CancellationEventKind::Completed { .. } => "cancellation.completed.v1",
            CancellationEventKind::Failed { .. } => "cancellation.failed.v1",
        }
    }

    fn aggregate_id(&self) -> String {
        self.cancellation_id.to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "EventCancellation"
    }

    fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }

    fn event_id(&self) -> DomainEventId {
        self.id.clone()
    }
}
