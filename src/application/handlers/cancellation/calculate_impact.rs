//! CalculateImpactHandler - Query handler for the impact of cancelling an event.

use std::sync::Arc;

use crate::domain::cancellation::{
    CancellationError, CancellationImpact, CancellationStatus, ImpactCalculator,
};
use crate::domain::catalog::Event;
use crate::domain::foundation::EventId;
use crate::ports::{CancellationRepository, EventCatalog, PaymentLedger};

/// Query for the impact of cancelling an event.
#[derive(Debug, Clone)]
pub struct CalculateImpactQuery {
    pub event_id: EventId,
}

/// Event as read from the catalog together with its computed impact.
#[derive(Debug, Clone)]
pub struct ImpactAssessment {
    pub event: Event,
    pub impact: CancellationImpact,
}

/// Handler for impact calculation.
///
/// Reads only. Calling it twice on an unchanged event gives identical
/// results.
pub struct CalculateImpactHandler {
    catalog: Arc<dyn EventCatalog>,
    ledger: Arc<dyn PaymentLedger>,
    repository: Arc<dyn CancellationRepository>,
    calculator: ImpactCalculator,
}

impl CalculateImpactHandler {
    pub fn new(
        catalog: Arc<dyn EventCatalog>,
        ledger: Arc<dyn PaymentLedger>,
        repository: Arc<dyn CancellationRepository>,
        calculator: ImpactCalculator,
    ) -> Self {
        Self {
            catalog,
            ledger,
            repository,
            calculator,
        }
    }

    pub async fn handle(&self, query: CalculateImpactQuery) -> Result<CancellationImpact, CancellationError> {
        Ok(self.assess(query.event_id).await?.impact)
    }

    /// Loads the event and computes its impact.
    ///
    /// # Errors
    ///
    /// - `EventNotFound` if the catalog has no such event
    /// - `EventAlreadyCancelled` if the catalog flags it or a cancellation
    ///   for it already completed
    /// - `CancellationInProgress` if another cancellation was confirmed
    /// - `Collaborator` if the catalog or ledger cannot be read
    pub async fn assess(&self, event_id: EventId) -> Result<ImpactAssessment, CancellationError> {
        let event = self
            .catalog
            .get_event(&event_id)
            .await
            .map_err(|e| CancellationError::collaborator("event catalog", e.message()))?
            .ok_or(CancellationError::EventNotFound(event_id))?;

        if event.is_cancelled {
            return Err(CancellationError::EventAlreadyCancelled(event_id));
        }

        let active = self
            .repository
            .find_by_event_id(&event_id)
            .await
            .map_err(|e| CancellationError::persistence(e.to_string()))?
            .into_iter()
            .find(|c| c.status.is_active());
        if let Some(active) = active {
            return Err(match active.status {
                CancellationStatus::Completed => CancellationError::EventAlreadyCancelled(event_id),
                _ => CancellationError::cancellation_in_progress(event_id, active.id),
            });
        }

        let distribution = self
            .ledger
            .payment_distribution(&event_id)
            .await
            .map_err(|e| CancellationError::collaborator("payment ledger", e.message()))?;

        let impact = self.calculator.calculate(&event, &distribution);
        tracing::debug!(
            event_id = %event_id,
            tickets_sold = impact.tickets_sold,
            net_refund = %impact.net_refund_amount,
            "Impact calculated"
        );

        Ok(ImpactAssessment { event, impact })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::cancellation::fixtures::{
        confirmed_full_refund, festival, small_event, Harness,
    };
    use crate::domain::foundation::Money;

    #[tokio::test]
    async fn festival_scenario_totals() {
        let harness = Harness::new();
        let event = festival();
        harness.add_event(&event);

        let impact = harness
            .impact
            .handle(CalculateImpactQuery { event_id: event.id })
            .await
            .unwrap();

        assert_eq!(impact.tickets_sold, 110);
        assert_eq!(impact.gross_revenue, Money::new(7_000_000));
        assert_eq!(impact.refund_total(), Money::new(7_000_000));
        assert_eq!(impact.vip_tickets, 10);
        assert_eq!(impact.attendees_count, 110);

        let by_method: u32 = impact
            .payment_method_breakdown
            .iter()
            .map(|b| b.ticket_count)
            .sum();
        assert_eq!(by_method, impact.tickets_sold);
    }

    #[tokio::test]
    async fn repeated_calculation_is_identical() {
        let harness = Harness::new();
        let event = festival();
        harness.add_event(&event);
        let query = CalculateImpactQuery { event_id: event.id };

        let first = harness.impact.handle(query.clone()).await.unwrap();
        let second = harness.impact.handle(query).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let harness = Harness::new();
        let missing = EventId::new();

        let err = harness
            .impact
            .handle(CalculateImpactQuery { event_id: missing })
            .await
            .unwrap_err();

        assert_eq!(err, CancellationError::EventNotFound(missing));
    }

    #[tokio::test]
    async fn confirmed_cancellation_blocks_new_assessments() {
        let harness = Harness::new();
        let event = small_event(2);
        harness.add_event(&event);
        let active = confirmed_full_refund(&harness, &event).await;

        let err = harness
            .impact
            .handle(CalculateImpactQuery { event_id: event.id })
            .await
            .unwrap_err();

        assert_eq!(err, CancellationError::cancellation_in_progress(event.id, active.id));
    }

    #[tokio::test]
    async fn cancelled_event_is_rejected() {
        let harness = Harness::new();
        let event = festival();
        harness.add_event(&event);
        harness.catalog.mark_cancelled(&event.id);

        let err = harness
            .impact
            .handle(CalculateImpactQuery { event_id: event.id })
            .await
            .unwrap_err();

        assert_eq!(err, CancellationError::EventAlreadyCancelled(event.id));
    }
}
