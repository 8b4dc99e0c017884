//! Organizer-facing step sequencer.
//!
//! `CancellationWizard` is a plain value. Forward transitions that need
//! collaborator output (impact, preview) take that output as an argument;
//! the application layer computes it and hands it in. A failed transition
//! leaves the wizard untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::EventId;

use super::{
    is_valid_confirmation, CancellationError, CancellationImpact, CancellationReason,
    CompensationPlan, CompensationRequest, NotificationPreview,
};

/// Wizard steps in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationStep {
    Reason,
    Impact,
    Compensation,
    Notification,
    FinancialReview,
    Confirm,
}

impl CancellationStep {
    pub fn next(&self) -> Option<CancellationStep> {
        use CancellationStep::*;
        match self {
            Reason => Some(Impact),
            Impact => Some(Compensation),
            Compensation => Some(Notification),
            Notification => Some(FinancialReview),
            FinancialReview => Some(Confirm),
            Confirm => None,
        }
    }

    pub fn previous(&self) -> Option<CancellationStep> {
        use CancellationStep::*;
        match self {
            Reason => None,
            Impact => Some(Reason),
            Compensation => Some(Impact),
            Notification => Some(Compensation),
            FinancialReview => Some(Notification),
            Confirm => Some(FinancialReview),
        }
    }
}

impl fmt::Display for CancellationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CancellationStep::Reason => "reason",
            CancellationStep::Impact => "impact",
            CancellationStep::Compensation => "compensation",
            CancellationStep::Notification => "notification",
            CancellationStep::FinancialReview => "financial review",
            CancellationStep::Confirm => "confirm",
        };
        f.write_str(s)
    }
}

/// Snapshot of an organizer's progress through the cancellation steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationWizard {
    pub event_id: EventId,
    pub current_step: CancellationStep,
    pub reason: Option<CancellationReason>,
    pub reason_note: Option<String>,
    pub impact: Option<CancellationImpact>,
    pub compensation: CompensationRequest,
    pub plan: Option<CompensationPlan>,
    pub preview: Option<NotificationPreview>,
    pub acknowledged_financial_impact: bool,
    pub confirmation_text: String,
}

impl CancellationWizard {
    /// Starts at the reason step with a full automatic refund preselected.
    pub fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            current_step: CancellationStep::Reason,
            reason: None,
            reason_note: None,
            impact: None,
            compensation: CompensationRequest::full_refund(event_id),
            plan: None,
            preview: None,
            acknowledged_financial_impact: false,
            confirmation_text: String::new(),
        }
    }

    /// Whether the current step's requirement is met.
    pub fn can_proceed(&self) -> bool {
        self.requirement_gap().is_none()
    }

    /// What is missing on the current step, if anything.
    fn requirement_gap(&self) -> Option<CancellationError> {
        match self.current_step {
            CancellationStep::Reason if self.reason.is_none() => {
                Some(CancellationError::MissingReason)
            }
            CancellationStep::Impact if self.impact.is_none() => Some(
                CancellationError::step_incomplete(self.current_step, "impact has not been calculated"),
            ),
            CancellationStep::FinancialReview if !self.acknowledged_financial_impact => {
                Some(CancellationError::step_incomplete(
                    self.current_step,
                    "acknowledge the financial impact",
                ))
            }
            CancellationStep::Confirm if !is_valid_confirmation(&self.confirmation_text) => {
                Some(CancellationError::invalid_confirmation_code())
            }
            _ => None,
        }
    }

    fn ensure_step(&self, expected: CancellationStep, action: &str) -> Result<(), CancellationError> {
        if self.current_step == expected {
            Ok(())
        } else {
            Err(CancellationError::invalid_state(
                format!("{} step", self.current_step),
                action,
            ))
        }
    }

    fn ensure_can_proceed(&self) -> Result<(), CancellationError> {
        match self.requirement_gap() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Edits
    // ───────────────────────────────────────────────────────────────

    /// Sets the reason. Only allowed on the reason step.
    pub fn select_reason(
        &mut self,
        reason: CancellationReason,
        note: Option<String>,
    ) -> Result<(), CancellationError> {
        self.ensure_step(CancellationStep::Reason, "select a reason on")?;
        self.reason = Some(reason);
        self.reason_note = note.filter(|n| !n.trim().is_empty());
        Ok(())
    }

    /// Replaces the compensation choices.
    ///
    /// Allowed on the compensation and notification steps. Any previously
    /// built plan and preview are discarded.
    pub fn update_compensation(&mut self, request: CompensationRequest) -> Result<(), CancellationError> {
        if !matches!(
            self.current_step,
            CancellationStep::Compensation | CancellationStep::Notification
        ) {
            return Err(CancellationError::invalid_state(
                format!("{} step", self.current_step),
                "edit compensation on",
            ));
        }
        self.compensation = CompensationRequest {
            event_id: self.event_id,
            ..request
        };
        self.plan = None;
        self.preview = None;
        Ok(())
    }

    pub fn acknowledge_financial_impact(&mut self, acknowledged: bool) -> Result<(), CancellationError> {
        self.ensure_step(CancellationStep::FinancialReview, "acknowledge impact on")?;
        self.acknowledged_financial_impact = acknowledged;
        Ok(())
    }

    pub fn set_confirmation_text(&mut self, text: impl Into<String>) -> Result<(), CancellationError> {
        self.ensure_step(CancellationStep::Confirm, "enter confirmation on")?;
        self.confirmation_text = text.into();
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────
    // Forward transitions
    // ───────────────────────────────────────────────────────────────

    /// Reason → Impact, storing the freshly calculated impact.
    pub fn advance_to_impact(&mut self, impact: CancellationImpact) -> Result<(), CancellationError> {
        self.ensure_step(CancellationStep::Reason, "advance to impact from")?;
        self.ensure_can_proceed()?;
        self.impact = Some(impact);
        self.plan = None;
        self.preview = None;
        self.current_step = CancellationStep::Impact;
        Ok(())
    }

    /// Impact → Compensation.
    pub fn advance_to_compensation(&mut self) -> Result<(), CancellationError> {
        self.ensure_step(CancellationStep::Impact, "advance to compensation from")?;
        self.ensure_can_proceed()?;
        self.current_step = CancellationStep::Compensation;
        Ok(())
    }

    /// Compensation → Notification, storing the built plan and preview.
    pub fn advance_to_notification(
        &mut self,
        plan: CompensationPlan,
        preview: NotificationPreview,
    ) -> Result<(), CancellationError> {
        self.ensure_step(CancellationStep::Compensation, "advance to notification from")?;
        self.ensure_can_proceed()?;
        self.plan = Some(plan);
        self.preview = Some(preview);
        self.current_step = CancellationStep::Notification;
        Ok(())
    }

    /// Replaces plan and preview while on the notification step.
    pub fn refresh_preview(
        &mut self,
        plan: CompensationPlan,
        preview: NotificationPreview,
    ) -> Result<(), CancellationError> {
        self.ensure_step(CancellationStep::Notification, "refresh the preview on")?;
        self.plan = Some(plan);
        self.preview = Some(preview);
        Ok(())
    }

    /// Notification → FinancialReview.
    pub fn advance_to_financial_review(&mut self) -> Result<(), CancellationError> {
        self.ensure_step(CancellationStep::Notification, "advance to financial review from")?;
        if self.plan.is_none() {
            return Err(CancellationError::step_incomplete(
                self.current_step,
                "compensation plan has not been built",
            ));
        }
        self.current_step = CancellationStep::FinancialReview;
        Ok(())
    }

    /// FinancialReview → Confirm.
    pub fn advance_to_confirm(&mut self) -> Result<(), CancellationError> {
        self.ensure_step(CancellationStep::FinancialReview, "advance to confirm from")?;
        self.ensure_can_proceed()?;
        self.current_step = CancellationStep::Confirm;
        Ok(())
    }

    /// Checks the confirm step is satisfied before submission.
    pub fn ensure_ready_to_submit(&self) -> Result<(), CancellationError> {
        self.ensure_step(CancellationStep::Confirm, "submit from")?;
        self.ensure_can_proceed()
    }

    /// Steps back one step. Not allowed from the reason step.
    pub fn go_back(&mut self) -> Result<(), CancellationError> {
        match self.current_step.previous() {
            Some(previous) => {
                self.current_step = previous;
                Ok(())
            }
            None => Err(CancellationError::invalid_state(
                "reason step",
                "go back from",
            )),
        }
    }
}
