//! ProcessCancellationHandler - Issues refunds and notifies attendees.
//!
//! # Phases
//!
//! 1. **Calculating** - load sold tickets, allocate the plan total per ticket
//! 2. **Notifying** - send the cancellation notice to each distinct holder
//! 3. **Refunding** - refund each ticket through the ledger
//! 4. **Finalizing** - complete the aggregate and publish the results
//!
//! Individual refund or notification failures are recorded and counted;
//! the cancellation still completes. Only a payment processor outage aborts
//! the run, leaving the cancellation `Failed`. A storage failure mid-run
//! does the same. A retry skips tickets already refunded and recipients
//! already notified, and reuses idempotency keys so a refund the ledger
//! executed but we never recorded is not repeated. A run that died without
//! recording anything leaves a stale `Processing` claim, which a later call
//! takes over once `stale_claim_after` has passed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::domain::cancellation::{
    CancellationError, CancellationEventKind, CancellationStatus, CancellationStep,
    EventCancellation, NotificationPreviewer, ProcessingPhase, ProcessingResults,
    RefundOutcome,
};
use crate::domain::catalog::{Attendee, SoldTicket};
use crate::domain::foundation::{CancellationId, CommandMetadata, Money};
use crate::ports::{
    CancellationRepository, EventPublisher, MessagingProvider, PaymentLedger, RefundKind,
    RefundRequest,
};

use super::support::{authorize, load, persist, publish};
use super::ProgressReporter;

/// Limits for one processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingSettings {
    /// Refunds in flight at once.
    pub refund_concurrency: usize,
    /// Notices in flight at once.
    pub notification_concurrency: usize,
    /// Age after which an untouched `Processing` claim is taken over.
    pub stale_claim_after: Duration,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            refund_concurrency: 8,
            notification_concurrency: 16,
            stale_claim_after: Duration::from_secs(900),
        }
    }
}

/// Command to process a confirmed (or previously failed) cancellation.
#[derive(Debug, Clone)]
pub struct ProcessCancellationCommand {
    pub cancellation_id: CancellationId,
}

/// Result of a processing run that reached `Completed`.
#[derive(Debug, Clone)]
pub struct ProcessCancellationResult {
    pub cancellation: EventCancellation,
    pub results: ProcessingResults,
}

struct RefundJob {
    ticket: SoldTicket,
    amount: Money,
}

/// Work left for this run.
struct Batch {
    refunds: Vec<RefundJob>,
    recipients: Vec<Attendee>,
}

/// Handler for cancellation processing.
pub struct ProcessCancellationHandler {
    repository: Arc<dyn CancellationRepository>,
    ledger: Arc<dyn PaymentLedger>,
    messaging: Arc<dyn MessagingProvider>,
    publisher: Arc<dyn EventPublisher>,
    settings: ProcessingSettings,
}

impl ProcessCancellationHandler {
    pub fn new(
        repository: Arc<dyn CancellationRepository>,
        ledger: Arc<dyn PaymentLedger>,
        messaging: Arc<dyn MessagingProvider>,
        publisher: Arc<dyn EventPublisher>,
        settings: ProcessingSettings,
    ) -> Self {
        Self {
            repository,
            ledger,
            messaging,
            publisher,
            settings,
        }
    }

    /// Runs processing to completion.
    ///
    /// `progress` is consumed and dropped before this returns.
    ///
    /// # Errors
    ///
    /// - `CancellationNotFound`
    /// - `NotOrganizer` unless the caller organizes the event
    /// - `InvalidState` unless the cancellation is `Confirmed`, `Failed` or
    ///   holds a stale `Processing` claim
    /// - `ConcurrentModification` if another run claimed it first
    /// - `CancellationInProgress` if another cancellation of the event is active
    /// - `ProcessorUnavailable` or `Persistence` (cancellation left `Failed`)
    pub async fn handle(
        &self,
        cmd: ProcessCancellationCommand,
        metadata: CommandMetadata,
        mut progress: ProgressReporter,
    ) -> Result<ProcessCancellationResult, CancellationError> {
        let mut cancellation = load(self.repository.as_ref(), cmd.cancellation_id).await?;
        authorize(&cancellation, &metadata.user_id)?;

        let last_update = cancellation.updated_at;
        if cancellation.release_stale_claim(self.settings.stale_claim_after) {
            tracing::warn!(
                cancellation_id = %cancellation.id,
                last_update = %last_update,
                "Taking over stale processing claim"
            );
        }

        // Claim the run; a concurrent processor loses the version check here
        cancellation.start_processing()?;
        persist(self.repository.as_ref(), &mut cancellation).await?;

        let attempt = cancellation.processing_attempts;
        tracing::info!(cancellation_id = %cancellation.id, attempt, "Processing started");
        self.announce(
            &cancellation,
            CancellationEventKind::ProcessingStarted { attempt },
            &metadata,
        )
        .await;

        if let Err(err) = self.execute(&mut cancellation, &mut progress).await {
            return Err(self.abort(cancellation, err, &metadata).await);
        }

        progress
            .report(ProcessingPhase::Finalizing, 0, 1, "Finalizing cancellation")
            .await;
        let mut completed = cancellation.clone();
        completed.complete()?;
        if let Err(err) = persist(self.repository.as_ref(), &mut completed).await {
            return Err(self.abort(cancellation, err, &metadata).await);
        }
        let cancellation = completed;

        let results = cancellation.results();
        self.announce(
            &cancellation,
            CancellationEventKind::Completed { results },
            &metadata,
        )
        .await;

        let summary = if results.has_errors {
            format!(
                "Completed with {} failed refunds and {} failed notifications",
                results.refunds_failed, results.notifications_failed
            )
        } else {
            "Cancellation completed".to_string()
        };
        progress.report(ProcessingPhase::Finalizing, 1, 1, summary).await;

        tracing::info!(
            cancellation_id = %cancellation.id,
            refunds_processed = results.refunds_processed,
            refunds_failed = results.refunds_failed,
            notifications_sent = results.notifications_sent,
            notifications_failed = results.notifications_failed,
            "Processing completed"
        );

        Ok(ProcessCancellationResult {
            cancellation,
            results,
        })
    }

    async fn execute(
        &self,
        cancellation: &mut EventCancellation,
        progress: &mut ProgressReporter,
    ) -> Result<(), CancellationError> {
        let batch = self.prepare(cancellation, progress).await?;
        self.notify(cancellation, batch.recipients, progress).await?;
        persist(self.repository.as_ref(), cancellation).await?;
        self.refund(cancellation, batch.refunds, progress).await
    }

    async fn prepare(
        &self,
        cancellation: &EventCancellation,
        progress: &mut ProgressReporter,
    ) -> Result<Batch, CancellationError> {
        progress
            .report(ProcessingPhase::Calculating, 0, 1, "Loading sold tickets")
            .await;

        let plan = cancellation.plan.as_ref().ok_or_else(|| {
            CancellationError::step_incomplete(
                CancellationStep::Compensation,
                "a compensation plan must be attached before processing",
            )
        })?;

        let tickets = self
            .ledger
            .sold_tickets(&cancellation.event_id)
            .await
            .map_err(|e| CancellationError::collaborator("payment ledger", e.message()))?;

        let refunds: Vec<RefundJob> = tickets
            .iter()
            .zip(plan.allocate(&tickets))
            .filter(|(ticket, _)| cancellation.needs_refund(&ticket.id))
            .map(|(ticket, allocation)| RefundJob {
                ticket: ticket.clone(),
                amount: allocation.amount,
            })
            .collect();

        let mut seen = HashSet::new();
        let recipients: Vec<Attendee> = tickets
            .iter()
            .filter(|t| seen.insert(t.holder.user_id.clone()))
            .filter(|t| !cancellation.is_notified(&t.holder.user_id))
            .map(|t| t.holder.clone())
            .collect();

        progress
            .report(
                ProcessingPhase::Calculating,
                1,
                1,
                format!(
                    "{} refunds and {} notifications to send",
                    refunds.len(),
                    recipients.len()
                ),
            )
            .await;

        Ok(Batch {
            refunds,
            recipients,
        })
    }

    async fn notify(
        &self,
        cancellation: &mut EventCancellation,
        recipients: Vec<Attendee>,
        progress: &mut ProgressReporter,
    ) -> Result<(), CancellationError> {
        let draft = cancellation.draft().ok_or_else(|| {
            CancellationError::step_incomplete(
                CancellationStep::Compensation,
                "a compensation plan must be attached before processing",
            )
        })?;
        let (subject, body) = NotificationPreviewer::render(&draft);

        let total = recipients.len();
        progress
            .report(ProcessingPhase::Notifying, 0, total, "Sending notifications")
            .await;

        let messaging = &self.messaging;
        let (subject, body) = (subject.as_str(), body.as_str());
        let mut deliveries = stream::iter(recipients)
            .map(|attendee| async move {
                let outcome = messaging
                    .send_cancellation_notice(&attendee, subject, body)
                    .await;
                (attendee, outcome)
            })
            .buffer_unordered(self.settings.notification_concurrency.max(1));

        let mut done = 0;
        while let Some((attendee, outcome)) = deliveries.next().await {
            done += 1;
            let delivered = match outcome {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        cancellation_id = %cancellation.id,
                        recipient = %attendee.user_id,
                        error = %e,
                        "Notification failed"
                    );
                    false
                }
            };
            cancellation.record_notification(attendee.user_id, delivered)?;
            progress
                .report(
                    ProcessingPhase::Notifying,
                    done,
                    total,
                    format!("Notified {} of {} attendees", done, total),
                )
                .await;
        }

        Ok(())
    }

    async fn refund(
        &self,
        cancellation: &mut EventCancellation,
        jobs: Vec<RefundJob>,
        progress: &mut ProgressReporter,
    ) -> Result<(), CancellationError> {
        let Some(plan) = cancellation.plan.clone() else {
            return Ok(());
        };

        let total = jobs.len();
        progress
            .report(ProcessingPhase::Refunding, 0, total, "Issuing refunds")
            .await;

        let cancellation_id = cancellation.id;
        let event_id = cancellation.event_id;
        let kind = RefundKind::from(plan.compensation_type);
        let method = plan.processing_method;
        let ledger = &self.ledger;

        let mut refunds = stream::iter(jobs)
            .map(|job| async move {
                let channel = method.channel_for(job.ticket.payment_method);
                let request = RefundRequest {
                    idempotency_key: RefundRequest::idempotency_key_for(&event_id, &job.ticket.id),
                    cancellation_id,
                    ticket_id: job.ticket.id,
                    amount: job.amount,
                    kind,
                    channel,
                    payment_method: job.ticket.payment_method,
                };
                let outcome = ledger.refund(request).await;
                (job, channel, outcome)
            })
            .buffer_unordered(self.settings.refund_concurrency.max(1));

        let mut done = 0;
        while let Some((job, channel, outcome)) = refunds.next().await {
            done += 1;
            let (recorded, abort) = match outcome {
                Ok(receipt) => (
                    RefundOutcome::Succeeded {
                        reference: receipt.reference,
                    },
                    None,
                ),
                Err(e) => {
                    tracing::warn!(
                        cancellation_id = %cancellation_id,
                        ticket_id = %job.ticket.id,
                        error = %e,
                        "Refund failed"
                    );
                    let abort = e
                        .is_catastrophic()
                        .then(|| CancellationError::processor_unavailable(e.message.clone()));
                    (
                        RefundOutcome::Failed {
                            reason: e.to_string(),
                        },
                        abort,
                    )
                }
            };

            cancellation.record_refund(
                job.ticket.id,
                job.ticket.holder.user_id,
                job.amount,
                channel,
                recorded,
            )?;

            // Dropping the stream abandons in-flight refunds; their
            // idempotency keys make the retry safe.
            if let Some(err) = abort {
                return Err(err);
            }

            progress
                .report(
                    ProcessingPhase::Refunding,
                    done,
                    total,
                    format!("Refunded {} of {} tickets", done, total),
                )
                .await;
        }

        Ok(())
    }

    /// Marks the run failed and returns the error that caused it.
    ///
    /// The in-memory aggregate carries every outcome recorded so far and is
    /// written first. If that write is refused, the stored copy is marked
    /// failed instead so the run can still be retried.
    async fn abort(
        &self,
        mut cancellation: EventCancellation,
        err: CancellationError,
        metadata: &CommandMetadata,
    ) -> CancellationError {
        tracing::error!(cancellation_id = %cancellation.id, error = %err, "Processing aborted");

        if let Err(e) = cancellation.fail(err.message()) {
            tracing::error!(cancellation_id = %cancellation.id, error = %e, "Could not mark cancellation failed");
            return err;
        }
        match persist(self.repository.as_ref(), &mut cancellation).await {
            Ok(()) => self.announce_failure(&cancellation, &err, metadata).await,
            Err(e) => {
                tracing::warn!(cancellation_id = %cancellation.id, error = %e, "Could not persist run outcomes; failing stored copy");
                self.fail_stored(cancellation.id, &err, metadata).await;
            }
        }
        err
    }

    /// Reloads the cancellation and marks it failed if still `Processing`.
    async fn fail_stored(
        &self,
        id: CancellationId,
        err: &CancellationError,
        metadata: &CommandMetadata,
    ) {
        let result = async {
            let mut stored = load(self.repository.as_ref(), id).await?;
            if stored.status != CancellationStatus::Processing {
                return Ok(None);
            }
            stored.fail(err.message())?;
            persist(self.repository.as_ref(), &mut stored).await?;
            Ok::<_, CancellationError>(Some(stored))
        }
        .await;

        match result {
            Ok(Some(stored)) => self.announce_failure(&stored, err, metadata).await,
            Ok(None) => {}
            Err(e) => tracing::error!(
                cancellation_id = %id,
                error = %e,
                "Could not mark cancellation failed; claim is released once stale"
            ),
        }
    }

    async fn announce_failure(
        &self,
        cancellation: &EventCancellation,
        err: &CancellationError,
        metadata: &CommandMetadata,
    ) {
        self.announce(
            cancellation,
            CancellationEventKind::Failed {
                reason: err.message(),
            },
            metadata,
        )
        .await;
    }

    /// Publishes without failing the run; the outcome is already persisted.
    async fn announce(
        &self,
        cancellation: &EventCancellation,
        kind: CancellationEventKind,
        metadata: &CommandMetadata,
    ) {
        if let Err(e) = publish(self.publisher.as_ref(), cancellation, kind, metadata).await {
            tracing::warn!(cancellation_id = %cancellation.id, error = %e, "Failed to publish cancellation event");
        }
    }
}
