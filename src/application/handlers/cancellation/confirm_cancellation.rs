//! ConfirmCancellationHandler - Checks the typed confirmation and confirms.

use std::sync::Arc;

use crate::domain::cancellation::{
    CancellationError, CancellationEventKind, CancellationStatus, EventCancellation,
};
use crate::domain::foundation::{CancellationId, CommandMetadata};
use crate::ports::{CancellationRepository, EventPublisher};

use super::support::{authorize, load, persist, publish};

/// Command to confirm a cancellation.
#[derive(Debug, Clone)]
pub struct ConfirmCancellationCommand {
    pub cancellation_id: CancellationId,
    /// What the organizer typed; must match `CONFIRM` ignoring case.
    pub confirmation_code: String,
}

/// Handler for confirmation.
///
/// The code is always checked here, whatever the client already checked.
/// Only one cancellation per event can be confirmed; the repository enforces
/// this atomically, the lookup here just reports it early.
pub struct ConfirmCancellationHandler {
    repository: Arc<dyn CancellationRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl ConfirmCancellationHandler {
    pub fn new(
        repository: Arc<dyn CancellationRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmCancellationCommand,
        metadata: CommandMetadata,
    ) -> Result<EventCancellation, CancellationError> {
        let mut cancellation = load(self.repository.as_ref(), cmd.cancellation_id).await?;
        authorize(&cancellation, &metadata.user_id)?;

        let rival = self
            .repository
            .find_by_event_id(&cancellation.event_id)
            .await
            .map_err(|e| CancellationError::from_repository(e, cancellation.id))?
            .into_iter()
            .find(|c| c.id != cancellation.id && c.status.is_active());
        if let Some(rival) = rival {
            tracing::warn!(
                cancellation_id = %cancellation.id,
                active_cancellation_id = %rival.id,
                "Event already has an active cancellation"
            );
            return Err(match rival.status {
                CancellationStatus::Completed => {
                    CancellationError::event_already_cancelled(cancellation.event_id)
                }
                _ => CancellationError::cancellation_in_progress(cancellation.event_id, rival.id),
            });
        }

        if let Err(e) = cancellation.confirm(&cmd.confirmation_code, metadata.user_id.clone()) {
            tracing::warn!(cancellation_id = %cancellation.id, error = %e, "Confirmation rejected");
            return Err(e);
        }

        persist(self.repository.as_ref(), &mut cancellation).await?;

        publish(
            self.publisher.as_ref(),
            &cancellation,
            CancellationEventKind::Confirmed {
                confirmed_by: metadata.user_id.clone(),
            },
            &metadata,
        )
        .await?;

        tracing::info!(cancellation_id = %cancellation.id, confirmed_by = %metadata.user_id, "Cancellation confirmed");

        Ok(cancellation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::cancellation::fixtures::{metadata, small_event, Harness};
    use crate::application::handlers::cancellation::{
        CreateCancellationCommand, GetCancellationQuery, UpdateCompensationPlanCommand,
    };
    use crate::domain::cancellation::{
        CancellationReason, CancellationStatus, CompensationRequest,
    };
    use crate::domain::foundation::{ErrorCode, EventId, UserId};

    async fn planned_for(harness: &Harness, event_id: EventId) -> EventCancellation {
        let c = harness
            .create
            .handle(
                CreateCancellationCommand {
                    event_id,
                    reason: CancellationReason::SafetyConcern,
                    reason_note: None,
                },
                metadata(),
            )
            .await
            .unwrap();
        harness
            .update_plan
            .handle(
                UpdateCompensationPlanCommand {
                    cancellation_id: c.id,
                    request: CompensationRequest::full_refund(event_id),
                },
                metadata(),
            )
            .await
            .unwrap()
    }

    async fn planned(harness: &Harness) -> EventCancellation {
        let event = small_event(3);
        harness.add_event(&event);
        planned_for(harness, event.id).await
    }

    fn confirm(c: &EventCancellation, code: &str) -> ConfirmCancellationCommand {
        ConfirmCancellationCommand {
            cancellation_id: c.id,
            confirmation_code: code.to_string(),
        }
    }

    #[tokio::test]
    async fn accepts_code_ignoring_case_and_outer_whitespace() {
        for code in ["CONFIRM", "confirm", " Confirm "] {
            let harness = Harness::new();
            let c = planned(&harness).await;

            let confirmed = harness.confirm.handle(confirm(&c, code), metadata()).await.unwrap();

            assert_eq!(confirmed.status, CancellationStatus::Confirmed);
            assert!(harness.bus.has_event("cancellation.confirmed.v1"));
        }
    }

    #[tokio::test]
    async fn rejects_other_text() {
        for code in ["", "CONFIRMED", "CON FIRM", "yes"] {
            let harness = Harness::new();
            let c = planned(&harness).await;

            let err = harness
                .confirm
                .handle(confirm(&c, code), metadata())
                .await
                .unwrap_err();

            assert_eq!(err, CancellationError::InvalidConfirmationCode);
            let stored = harness
                .get
                .handle(GetCancellationQuery { cancellation_id: c.id })
                .await
                .unwrap();
            assert_eq!(stored.status, CancellationStatus::Pending);
        }
    }

    #[tokio::test]
    async fn non_organizer_cannot_confirm() {
        let harness = Harness::new();
        let c = planned(&harness).await;
        let stranger = UserId::new("stranger-99").unwrap();

        let err = harness
            .confirm
            .handle(confirm(&c, "CONFIRM"), CommandMetadata::new(stranger.clone()))
            .await
            .unwrap_err();

        assert_eq!(err, CancellationError::not_organizer(stranger, c.event_id));
        assert!(!harness.bus.has_event("cancellation.confirmed.v1"));
    }

    #[tokio::test]
    async fn second_draft_of_an_event_cannot_be_confirmed() {
        let harness = Harness::new();
        let event = small_event(5);
        harness.add_event(&event);
        let first = planned_for(&harness, event.id).await;
        let second = planned_for(&harness, event.id).await;

        harness
            .confirm
            .handle(confirm(&first, "CONFIRM"), metadata())
            .await
            .unwrap();
        let err = harness
            .confirm
            .handle(confirm(&second, "CONFIRM"), metadata())
            .await
            .unwrap_err();

        assert_eq!(err, CancellationError::cancellation_in_progress(event.id, first.id));
        assert_eq!(err.code(), ErrorCode::CancellationInProgress);
        let stored = harness
            .get
            .handle(GetCancellationQuery { cancellation_id: second.id })
            .await
            .unwrap();
        assert_eq!(stored.status, CancellationStatus::Pending);
    }

    #[tokio::test]
    async fn stale_writer_gets_concurrent_modification() {
        let harness = Harness::new();
        let c = planned(&harness).await;

        // Another writer persists first
        let mut other = c.clone();
        other.reason_note = Some("changed elsewhere".to_string());
        let expected = other.bump_version();
        harness.repository.update(&other, expected).await.unwrap();

        // Simulate a confirm built on the stale snapshot
        let mut stale = c.clone();
        stale.confirm("CONFIRM", metadata().user_id).unwrap();
        let expected = stale.bump_version();
        let err = harness.repository.update(&stale, expected).await.unwrap_err();
        let err = CancellationError::from_repository(err, c.id);

        assert_eq!(err, CancellationError::ConcurrentModification(c.id));
        assert!(err.is_retryable());
    }
}
