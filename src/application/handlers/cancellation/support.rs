//! Persistence and publication steps shared by the cancellation handlers.

use crate::domain::cancellation::{
    CancellationError, CancellationEvent, CancellationEventKind, EventCancellation,
};
use crate::domain::foundation::{
    CancellationId, CommandMetadata, SerializableDomainEvent, UserId,
};
use crate::ports::{CancellationRepository, EventPublisher};

/// Loads a cancellation or fails with `CancellationNotFound`.
pub(super) async fn load(
    repository: &dyn CancellationRepository,
    id: CancellationId,
) -> Result<EventCancellation, CancellationError> {
    repository
        .find_by_id(&id)
        .await
        .map_err(|e| CancellationError::from_repository(e, id))?
        .ok_or(CancellationError::CancellationNotFound(id))
}

/// Writes the next version of `cancellation`.
///
/// On failure the version is put back, so the aggregate still matches what
/// is stored and can be written again.
pub(super) async fn persist(
    repository: &dyn CancellationRepository,
    cancellation: &mut EventCancellation,
) -> Result<(), CancellationError> {
    let expected = cancellation.bump_version();
    if let Err(e) = repository.update(cancellation, expected).await {
        cancellation.version = expected;
        return Err(CancellationError::from_repository(e, cancellation.id));
    }
    Ok(())
}

/// Fails unless `user_id` may act on `cancellation`.
pub(super) fn authorize(
    cancellation: &EventCancellation,
    user_id: &UserId,
) -> Result<(), CancellationError> {
    cancellation.ensure_organizer(user_id).map_err(|e| {
        tracing::warn!(
            cancellation_id = %cancellation.id,
            user_id = %user_id,
            "Rejected non-organizer"
        );
        e
    })
}

/// Publishes one cancellation event stamped with the request context.
pub(super) async fn publish(
    publisher: &dyn EventPublisher,
    cancellation: &EventCancellation,
    kind: CancellationEventKind,
    metadata: &CommandMetadata,
) -> Result<(), CancellationError> {
    let envelope = CancellationEvent::new(cancellation.id, cancellation.event_id, kind)
        .to_envelope()
        .with_correlation_id(metadata.correlation_id())
        .with_user_id(metadata.user_id.to_string());

    tracing::debug!(
        event_type = %envelope.event_type,
        cancellation_id = %cancellation.id,
        source = metadata.source().unwrap_or("unknown"),
        "Publishing cancellation event"
    );
    publisher.publish(envelope).await.map_err(CancellationError::from)
}
