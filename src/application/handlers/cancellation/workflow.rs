//! CancellationWorkflow - Drives the organizer's wizard between steps.
//!
//! The wizard is a value: every call takes a snapshot and returns the next
//! one. On error the caller keeps its previous snapshot, so a failed impact
//! calculation or an invalid plan leaves the organizer on the same step.

use std::sync::Arc;

use crate::domain::cancellation::{
    CancellationDraft, CancellationError, CancellationStep, CancellationWizard,
    CompensationPlan, CompensationPlanner, CompensationRequest, NotificationPreview,
};
use crate::domain::foundation::EventId;

use super::{
    CalculateImpactHandler, CalculateImpactQuery, PreviewNotificationHandler,
    PreviewNotificationQuery,
};

pub struct CancellationWorkflow {
    impact: Arc<CalculateImpactHandler>,
    preview: Arc<PreviewNotificationHandler>,
}

impl CancellationWorkflow {
    pub fn new(impact: Arc<CalculateImpactHandler>, preview: Arc<PreviewNotificationHandler>) -> Self {
        Self { impact, preview }
    }

    /// Fresh wizard on the reason step.
    pub fn start(&self, event_id: EventId) -> CancellationWizard {
        CancellationWizard::new(event_id)
    }

    /// Moves one step forward, computing what the next step shows.
    ///
    /// Leaving the reason step calculates the impact; leaving the
    /// compensation step builds the plan and renders the preview.
    pub async fn advance(
        &self,
        mut wizard: CancellationWizard,
    ) -> Result<CancellationWizard, CancellationError> {
        match wizard.current_step {
            CancellationStep::Reason => {
                if wizard.reason.is_none() {
                    return Err(CancellationError::MissingReason);
                }
                let impact = self
                    .impact
                    .handle(CalculateImpactQuery {
                        event_id: wizard.event_id,
                    })
                    .await?;
                wizard.advance_to_impact(impact)?;
            }
            CancellationStep::Impact => wizard.advance_to_compensation()?,
            CancellationStep::Compensation => {
                let (plan, preview) = self.plan_and_preview(&wizard).await?;
                wizard.advance_to_notification(plan, preview)?;
            }
            CancellationStep::Notification => wizard.advance_to_financial_review()?,
            CancellationStep::FinancialReview => wizard.advance_to_confirm()?,
            CancellationStep::Confirm => {
                return Err(CancellationError::invalid_state("confirm step", "advance past"));
            }
        }

        tracing::debug!(event_id = %wizard.event_id, step = %wizard.current_step, "Wizard advanced");
        Ok(wizard)
    }

    /// Replaces the compensation choices; on the notification step the plan
    /// and preview are rebuilt immediately.
    pub async fn update_compensation(
        &self,
        mut wizard: CancellationWizard,
        request: CompensationRequest,
    ) -> Result<CancellationWizard, CancellationError> {
        wizard.update_compensation(request)?;
        if wizard.current_step == CancellationStep::Notification {
            let (plan, preview) = self.plan_and_preview(&wizard).await?;
            wizard.refresh_preview(plan, preview)?;
        }
        Ok(wizard)
    }

    pub fn go_back(&self, mut wizard: CancellationWizard) -> Result<CancellationWizard, CancellationError> {
        wizard.go_back()?;
        Ok(wizard)
    }

    async fn plan_and_preview(
        &self,
        wizard: &CancellationWizard,
    ) -> Result<(CompensationPlan, NotificationPreview), CancellationError> {
        let impact = wizard.impact.as_ref().ok_or_else(|| {
            CancellationError::step_incomplete(CancellationStep::Impact, "impact has not been calculated")
        })?;
        let reason = wizard.reason.ok_or(CancellationError::MissingReason)?;

        let plan = CompensationPlanner::build_plan(impact, &wizard.compensation)?;
        let draft = CancellationDraft {
            event_id: wizard.event_id,
            event_title: impact.event_title.clone(),
            reason,
            reason_note: wizard.reason_note.clone(),
            impact: impact.clone(),
            plan: plan.clone(),
        };
        let preview = self.preview.handle(PreviewNotificationQuery { draft }).await?;

        Ok((plan, preview))
    }
}
