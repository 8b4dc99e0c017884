//! UpdateCompensationPlanHandler - Attaches a validated plan to a pending cancellation.

use std::sync::Arc;

use crate::domain::cancellation::{
    CancellationError, CancellationEventKind, CompensationPlanner, CompensationRequest,
    EventCancellation,
};
use crate::domain::foundation::{CancellationId, CommandMetadata};
use crate::ports::{CancellationRepository, EventPublisher};

use super::support::{authorize, load, persist, publish};

/// Command to set or replace the compensation plan.
#[derive(Debug, Clone)]
pub struct UpdateCompensationPlanCommand {
    pub cancellation_id: CancellationId,
    pub request: CompensationRequest,
}

/// Handler for compensation plan updates.
///
/// The plan is rebuilt server-side from the stored impact snapshot.
pub struct UpdateCompensationPlanHandler {
    repository: Arc<dyn CancellationRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl UpdateCompensationPlanHandler {
    pub fn new(
        repository: Arc<dyn CancellationRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// # Errors
    ///
    /// - `CancellationNotFound`
    /// - `NotOrganizer` unless the caller organizes the event
    /// - `InvalidCompensationParameters` when the request is out of bounds
    /// - `PlanAlreadyFinalized` once the cancellation left `Pending`
    /// - `ConcurrentModification` if another writer got there first
    pub async fn handle(
        &self,
        cmd: UpdateCompensationPlanCommand,
        metadata: CommandMetadata,
    ) -> Result<EventCancellation, CancellationError> {
        let mut cancellation = load(self.repository.as_ref(), cmd.cancellation_id).await?;
        authorize(&cancellation, &metadata.user_id)?;

        let plan = CompensationPlanner::build_plan(&cancellation.impact, &cmd.request)?;
        let compensation_type = plan.compensation_type;
        let total_refund_amount = plan.total_refund_amount;
        cancellation.attach_plan(plan)?;

        persist(self.repository.as_ref(), &mut cancellation).await?;

        publish(
            self.publisher.as_ref(),
            &cancellation,
            CancellationEventKind::PlanUpdated {
                compensation_type,
                total_refund_amount,
            },
            &metadata,
        )
        .await?;

        tracing::info!(
            cancellation_id = %cancellation.id,
            compensation_type = ?compensation_type,
            total_refund = %total_refund_amount,
            "Compensation plan updated"
        );

        Ok(cancellation)
    }
}
