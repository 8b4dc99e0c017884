//! PreviewNotificationHandler - Renders the attendee notice for a draft.

use std::sync::Arc;

use crate::domain::cancellation::{
    CancellationDraft, CancellationError, NotificationPreview, NotificationPreviewer,
};
use crate::domain::catalog::Attendee;
use crate::ports::PaymentLedger;

/// Query for a notification preview.
#[derive(Debug, Clone)]
pub struct PreviewNotificationQuery {
    pub draft: CancellationDraft,
}

/// Handler for notification previews.
///
/// The rendered text depends only on the draft. The ledger is consulted
/// for sample recipient names.
pub struct PreviewNotificationHandler {
    ledger: Arc<dyn PaymentLedger>,
}

impl PreviewNotificationHandler {
    pub fn new(ledger: Arc<dyn PaymentLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, query: PreviewNotificationQuery) -> Result<NotificationPreview, CancellationError> {
        let recipients: Vec<Attendee> = self
            .ledger
            .sold_tickets(&query.draft.event_id)
            .await
            .map_err(|e| CancellationError::collaborator("payment ledger", e.message()))?
            .into_iter()
            .map(|t| t.holder)
            .collect();

        Ok(NotificationPreviewer::preview(&query.draft, &recipients))
    }
}
