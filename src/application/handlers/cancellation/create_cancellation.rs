//! CreateCancellationHandler - Command handler for starting a cancellation.

use std::sync::Arc;

use crate::domain::cancellation::{
    CancellationError, CancellationEventKind, CancellationReason, EventCancellation,
};
use crate::domain::foundation::{CancellationId, CommandMetadata, EventId};
use crate::ports::{CancellationRepository, EventPublisher};

use super::support::publish;
use super::CalculateImpactHandler;

/// Command to create a pending cancellation.
#[derive(Debug, Clone)]
pub struct CreateCancellationCommand {
    pub event_id: EventId,
    pub reason: CancellationReason,
    pub reason_note: Option<String>,
}

/// Handler for creating cancellations.
///
/// The impact snapshot is recomputed here from the catalog and ledger;
/// client-supplied figures are never trusted.
pub struct CreateCancellationHandler {
    impact: Arc<CalculateImpactHandler>,
    repository: Arc<dyn CancellationRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl CreateCancellationHandler {
    pub fn new(
        impact: Arc<CalculateImpactHandler>,
        repository: Arc<dyn CancellationRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            impact,
            repository,
            publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCancellationCommand,
        metadata: CommandMetadata,
    ) -> Result<EventCancellation, CancellationError> {
        // 1. Snapshot the event and its impact
        let assessment = self.impact.assess(cmd.event_id).await?;
        if !assessment.event.is_organized_by(&metadata.user_id) {
            tracing::warn!(event_id = %cmd.event_id, user_id = %metadata.user_id, "Rejected non-organizer");
            return Err(CancellationError::not_organizer(
                metadata.user_id.clone(),
                cmd.event_id,
            ));
        }

        // 2. Create aggregate
        let cancellation = EventCancellation::create(
            CancellationId::new(),
            &assessment.event,
            cmd.reason,
            cmd.reason_note,
            assessment.impact,
            metadata.user_id.clone(),
        );

        // 3. Persist
        self.repository
            .save(&cancellation)
            .await
            .map_err(|e| CancellationError::persistence(e.to_string()))?;

        // 4. Publish
        publish(
            self.publisher.as_ref(),
            &cancellation,
            CancellationEventKind::Created {
                reason: cancellation.reason,
                initiated_by: cancellation.initiated_by.clone(),
            },
            &metadata,
        )
        .await?;

        tracing::info!(
            cancellation_id = %cancellation.id,
            event_id = %cancellation.event_id,
            reason = %cancellation.reason,
            "Cancellation created"
        );

        Ok(cancellation)
    }
}
