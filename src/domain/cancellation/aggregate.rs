//! EventCancellation aggregate.
//!
//! Holds all workflow state for one cancellation attempt of one event.
//!
//! # Design Decisions
//!
//! - **Impact is a snapshot**: computed when the aggregate is created, never
//!   rewritten afterwards
//! - **Per-ticket refund records**: a retry after a catastrophic failure skips
//!   tickets already refunded and recipients already notified
//! - **Optimistic versioning**: `version` is bumped once per persisted change;
//!   the repository rejects stale writers

use serde::{Deserialize, Serialize};

use crate::domain::catalog::Event;
use crate::domain::foundation::{
    CancellationId, EventId, Money, StateMachine, TicketId, Timestamp, UserId,
};

use super::{
    verify_confirmation, CancellationDraft, CancellationError, CancellationImpact,
    CancellationReason, CancellationStatus, CancellationStep, CompensationPlan, RefundChannel,
    CONFIRMATION_TOKEN,
};

/// Result of the latest refund attempt for one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefundOutcome {
    Succeeded { reference: String },
    Failed { reason: String },
}

/// Refund bookkeeping for one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub ticket_id: TicketId,
    pub recipient: UserId,
    pub amount: Money,
    pub channel: RefundChannel,
    pub outcome: RefundOutcome,
    pub attempts: u32,
    pub last_attempt_at: Timestamp,
}

impl RefundRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, RefundOutcome::Succeeded { .. })
    }
}

/// Counters reported to the organizer once processing ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResults {
    pub refunds_processed: u32,
    pub refunds_failed: u32,
    pub notifications_sent: u32,
    pub notifications_failed: u32,
    pub has_errors: bool,
}

/// EventCancellation aggregate.
///
/// # Invariants
///
/// - `plan` can change only while `status == Pending`
/// - `confirmed_by`/`confirmed_at` are set exactly when status left `Pending`
/// - at most one `RefundRecord` per ticket
/// - `completed_at` is set only in `Completed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCancellation {
    pub id: CancellationId,

    pub event_id: EventId,

    pub event_title: String,

    /// Organizer of the cancelled event.
    pub organizer_id: UserId,

    pub reason: CancellationReason,

    pub reason_note: Option<String>,

    /// Snapshot taken at creation.
    pub impact: CancellationImpact,

    pub plan: Option<CompensationPlan>,

    pub status: CancellationStatus,

    pub initiated_by: UserId,

    /// Normalized confirmation token, once confirmed.
    pub confirmation_code: Option<String>,

    pub confirmed_by: Option<UserId>,

    pub confirmed_at: Option<Timestamp>,

    pub refund_records: Vec<RefundRecord>,

    /// Recipients who have received the notice.
    pub notified_recipients: Vec<UserId>,

    /// Recipients whose latest delivery attempt failed.
    pub failed_notifications: Vec<UserId>,

    pub processing_attempts: u32,

    /// Why the last processing attempt aborted.
    pub failure_reason: Option<String>,

    pub version: u64,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,

    pub completed_at: Option<Timestamp>,
}

impl EventCancellation {
    /// Creates a pending cancellation for `event`.
    pub fn create(
        id: CancellationId,
        event: &Event,
        reason: CancellationReason,
        reason_note: Option<String>,
        impact: CancellationImpact,
        initiated_by: UserId,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            event_id: event.id,
            event_title: event.title.clone(),
            organizer_id: event.organizer_id.clone(),
            reason,
            reason_note: reason_note.filter(|n| !n.trim().is_empty()),
            impact,
            plan: None,
            status: CancellationStatus::Pending,
            initiated_by,
            confirmation_code: None,
            confirmed_by: None,
            confirmed_at: None,
            refund_records: Vec::new(),
            notified_recipients: Vec::new(),
            failed_notifications: Vec::new(),
            processing_attempts: 0,
            failure_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    fn transition_to(
        &mut self,
        target: CancellationStatus,
        attempted: &str,
    ) -> Result<(), CancellationError> {
        let current = self.status;
        self.status = current
            .transition_to(target)
            .map_err(|_| CancellationError::invalid_state(current.as_str(), attempted))?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    fn ensure_processing(&self, attempted: &str) -> Result<(), CancellationError> {
        if self.status == CancellationStatus::Processing {
            Ok(())
        } else {
            Err(CancellationError::invalid_state(self.status.as_str(), attempted))
        }
    }

    /// Increments the version for the next save and returns the one it
    /// replaces.
    pub fn bump_version(&mut self) -> u64 {
        let expected = self.version;
        self.version += 1;
        expected
    }

    /// Rejects callers other than the event's organizer.
    pub fn ensure_organizer(&self, user_id: &UserId) -> Result<(), CancellationError> {
        if self.organizer_id == *user_id {
            Ok(())
        } else {
            Err(CancellationError::not_organizer(user_id.clone(), self.event_id))
        }
    }

    /// Returns true once processing finished successfully.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    // ───────────────────────────────────────────────────────────────
    // Planning and confirmation
    // ───────────────────────────────────────────────────────────────

    /// Attaches or replaces the compensation plan.
    ///
    /// # Errors
    ///
    /// `PlanAlreadyFinalized` once the cancellation has left `Pending`.
    pub fn attach_plan(&mut self, plan: CompensationPlan) -> Result<(), CancellationError> {
        if !self.status.is_editable() {
            return Err(CancellationError::plan_already_finalized(self.id));
        }
        self.plan = Some(plan);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Confirms the cancellation with the typed code.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless pending
    /// - `StepIncomplete` if no plan is attached
    /// - `InvalidConfirmationCode` if the code does not match
    pub fn confirm(&mut self, code: &str, confirmed_by: UserId) -> Result<(), CancellationError> {
        if self.status != CancellationStatus::Pending {
            return Err(CancellationError::invalid_state(self.status.as_str(), "confirm"));
        }
        if self.plan.is_none() {
            return Err(CancellationError::step_incomplete(
                CancellationStep::Compensation,
                "a compensation plan must be attached before confirming",
            ));
        }
        verify_confirmation(code)?;

        self.transition_to(CancellationStatus::Confirmed, "confirm")?;
        self.confirmation_code = Some(CONFIRMATION_TOKEN.to_string());
        self.confirmed_by = Some(confirmed_by);
        self.confirmed_at = Some(self.updated_at);
        Ok(())
    }

    /// Renders the inputs for a notification preview.
    pub fn draft(&self) -> Option<CancellationDraft> {
        self.plan.as_ref().map(|plan| CancellationDraft {
            event_id: self.event_id,
            event_title: self.event_title.clone(),
            reason: self.reason,
            reason_note: self.reason_note.clone(),
            impact: self.impact.clone(),
            plan: plan.clone(),
        })
    }

    // ───────────────────────────────────────────────────────────────
    // Processing
    // ───────────────────────────────────────────────────────────────

    /// Enters `Processing` from `Confirmed`, or from `Failed` on retry.
    pub fn start_processing(&mut self) -> Result<(), CancellationError> {
        self.transition_to(CancellationStatus::Processing, "process")?;
        self.processing_attempts += 1;
        self.failure_reason = None;
        Ok(())
    }

    /// True unless a refund for this ticket already succeeded.
    pub fn needs_refund(&self, ticket_id: &TicketId) -> bool {
        !self
            .refund_records
            .iter()
            .any(|r| r.ticket_id == *ticket_id && r.succeeded())
    }

    pub fn is_notified(&self, user_id: &UserId) -> bool {
        self.notified_recipients.contains(user_id)
    }

    /// Records the outcome of one refund attempt.
    pub fn record_refund(
        &mut self,
        ticket_id: TicketId,
        recipient: UserId,
        amount: Money,
        channel: RefundChannel,
        outcome: RefundOutcome,
    ) -> Result<(), CancellationError> {
        self.ensure_processing("record a refund for")?;
        let now = Timestamp::now();

        match self.refund_records.iter_mut().find(|r| r.ticket_id == ticket_id) {
            Some(record) => {
                record.amount = amount;
                record.channel = channel;
                record.outcome = outcome;
                record.attempts += 1;
                record.last_attempt_at = now;
            }
            None => self.refund_records.push(RefundRecord {
                ticket_id,
                recipient,
                amount,
                channel,
                outcome,
                attempts: 1,
                last_attempt_at: now,
            }),
        }
        self.updated_at = now;
        Ok(())
    }

    /// Records the outcome of one notification attempt.
    pub fn record_notification(
        &mut self,
        recipient: UserId,
        delivered: bool,
    ) -> Result<(), CancellationError> {
        self.ensure_processing("record a notification for")?;
        self.failed_notifications.retain(|r| *r != recipient);
        if delivered {
            if !self.notified_recipients.contains(&recipient) {
                self.notified_recipients.push(recipient);
            }
        } else if !self.notified_recipients.contains(&recipient) {
            self.failed_notifications.push(recipient);
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Finishes processing. Per-item failures are reported through
    /// `results().has_errors`, not through the status.
    pub fn complete(&mut self) -> Result<(), CancellationError> {
        self.transition_to(CancellationStatus::Completed, "complete")?;
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    /// Aborts processing after a catastrophic failure.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), CancellationError> {
        self.transition_to(CancellationStatus::Failed, "fail")?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    /// Fails a `Processing` claim left untouched for longer than `max_age`
    /// so a run that died mid-way can be retried. Returns true if released.
    pub fn release_stale_claim(&mut self, max_age: std::time::Duration) -> bool {
        if self.status != CancellationStatus::Processing || !self.updated_at.is_older_than(max_age) {
            return false;
        }
        self.fail("processing claim expired").is_ok()
    }

    /// Current counters derived from the refund and notification records.
    pub fn results(&self) -> ProcessingResults {
        let refunds_processed = self.refund_records.iter().filter(|r| r.succeeded()).count() as u32;
        let refunds_failed = self.refund_records.len() as u32 - refunds_processed;
        let notifications_sent = self.notified_recipients.len() as u32;
        let notifications_failed = self.failed_notifications.len() as u32;

        ProcessingResults {
            refunds_processed,
            refunds_failed,
            notifications_sent,
            notifications_failed,
            has_errors: refunds_failed > 0 || notifications_failed > 0,
        }
    }

    /// Total refunded so far.
    pub fn refunded_amount(&self) -> Money {
        self.refund_records
            .iter()
            .filter(|r| r.succeeded())
            .map(|r| r.amount)
            .sum()
    }
}
