//! Attendee notification templates and preview rendering.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::Attendee;
use crate::domain::foundation::{EventId, Money, Rate};

use super::{
    CancellationImpact, CancellationReason, CompensationPlan, CompensationType, ProcessingMethod,
};

/// Maximum sample recipients shown in a preview.
pub const SAMPLE_RECIPIENT_LIMIT: usize = 5;

/// Tone of the cancellation notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    #[default]
    Standard,
    Apology,
    Formal,
}

impl NotificationTemplate {
    fn subject(&self, event_title: &str) -> String {
        match self {
            NotificationTemplate::Standard => format!("Event cancelled: {}", event_title),
            NotificationTemplate::Apology => {
                format!("We're sorry: {} has been cancelled", event_title)
            }
            NotificationTemplate::Formal => format!("Notice of cancellation: {}", event_title),
        }
    }

    fn greeting(&self) -> &'static str {
        match self {
            NotificationTemplate::Standard => "Hi there,",
            NotificationTemplate::Apology => "Dear attendee,",
            NotificationTemplate::Formal => "Dear ticket holder,",
        }
    }

    fn opening(&self, event_title: &str) -> String {
        match self {
            NotificationTemplate::Standard => {
                format!("{} has been cancelled.", event_title)
            }
            NotificationTemplate::Apology => format!(
                "We are truly sorry to let you know that {} has been cancelled. We know you were looking forward to it.",
                event_title
            ),
            NotificationTemplate::Formal => format!(
                "Please be advised that {} has been cancelled by the organizer.",
                event_title
            ),
        }
    }

    fn sign_off(&self) -> &'static str {
        match self {
            NotificationTemplate::Standard => "Thanks for your understanding.",
            NotificationTemplate::Apology => "With our sincere apologies,\nThe organizing team",
            NotificationTemplate::Formal => "Kind regards,\nThe organizer",
        }
    }
}

/// Everything the previewer needs about a cancellation in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationDraft {
    pub event_id: EventId,
    pub event_title: String,
    pub reason: CancellationReason,
    #[serde(default)]
    pub reason_note: Option<String>,
    pub impact: CancellationImpact,
    pub plan: CompensationPlan,
}

/// Rendered notice as attendees will see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreview {
    pub recipient_count: u32,
    pub subject: String,
    pub body: String,
    /// Up to five recipient names.
    pub sample_recipients: Vec<String>,
}

/// Renders notification previews. Pure and deterministic.
pub struct NotificationPreviewer;

impl NotificationPreviewer {
    /// Renders the notice for `draft`.
    ///
    /// `recipients` is only used for the sample list; the count always
    /// comes from the impact snapshot.
    pub fn preview(draft: &CancellationDraft, recipients: &[Attendee]) -> NotificationPreview {
        let (subject, body) = Self::render(draft);

        let mut sample_recipients: Vec<String> = Vec::new();
        let mut seen = Vec::new();
        for attendee in recipients {
            if sample_recipients.len() == SAMPLE_RECIPIENT_LIMIT {
                break;
            }
            if seen.contains(&&attendee.user_id) {
                continue;
            }
            seen.push(&attendee.user_id);
            sample_recipients.push(attendee.name.clone());
        }

        NotificationPreview {
            recipient_count: draft.impact.attendees_count,
            subject,
            body,
            sample_recipients,
        }
    }

    /// Subject and body sent to every recipient.
    pub fn render(draft: &CancellationDraft) -> (String, String) {
        let template = draft.plan.notification_template;
        let subject = template.subject(&draft.event_title);

        let mut paragraphs = vec![
            template.greeting().to_string(),
            template.opening(&draft.event_title),
            format!("Reason: {}. {}", draft.reason, draft.reason.attendee_explanation()),
        ];
        if let Some(note) = draft.reason_note.as_deref().filter(|n| !n.trim().is_empty()) {
            paragraphs.push(note.trim().to_string());
        }
        paragraphs.push(compensation_summary(&draft.plan, &draft.impact));
        paragraphs.push(template.sign_off().to_string());
        // Organizer's own words close the message
        if let Some(message) = draft.plan.custom_message.as_deref() {
            paragraphs.push(message.to_string());
        }

        (subject, paragraphs.join("\n\n"))
    }
}

fn compensation_summary(plan: &CompensationPlan, impact: &CancellationImpact) -> String {
    let what = match plan.compensation_type {
        CompensationType::FullRefund => "You will receive a full refund of your ticket price.".to_string(),
        CompensationType::PartialRefund => format!(
            "You will receive a refund of {} of your ticket price.",
            plan.refund_percentage.unwrap_or(Rate::ONE)
        ),
        CompensationType::EventCredit => format!(
            "You will receive event credit worth {} of your ticket price, usable for future events.",
            plan.credit_multiplier.unwrap_or(Rate::ONE)
        ),
    };

    let how = match plan.processing_method {
        ProcessingMethod::Automatic => {
            let slowest = impact
                .payment_method_breakdown
                .iter()
                .map(|m| m.processing_time.max_days)
                .max();
            match slowest {
                Some(days) if plan.compensation_type != CompensationType::EventCredit => format!(
                    "It will be issued automatically to your original payment method within {} business days.",
                    days
                ),
                _ => "It will be issued automatically.".to_string(),
            }
        }
        ProcessingMethod::Manual => {
            "The organizer will contact you directly to arrange it.".to_string()
        }
        ProcessingMethod::Hybrid => "Card and e-wallet payments are refunded automatically; the organizer will contact you if you paid by cash or bank transfer.".to_string(),
    };

    if plan.total_refund_amount == Money::ZERO {
        what
    } else {
        format!("{} {}", what, how)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::PaymentMethod;
    use crate::domain::cancellation::{CompensationPlanner, CompensationRequest, PaymentMethodBreakdown, ProcessingTimeEstimate};
    use crate::domain::foundation::UserId;

    fn impact(attendees: u32) -> CancellationImpact {
        CancellationImpact {
            event_id: EventId::new(),
            event_title: "Summer Festival".to_string(),
            tickets_sold: attendees,
            attendees_count: attendees,
            vip_tickets: 0,
            ticket_type_breakdown: vec![],
            payment_method_breakdown: vec![PaymentMethodBreakdown {
                method: PaymentMethod::Card,
                ticket_count: attendees,
                processing_time: ProcessingTimeEstimate::new(5, 10),
            }],
            gross_revenue: Money::new(1_000_000),
            platform_fees_retained: Money::ZERO,
            processing_fees_estimate: Money::ZERO,
            net_refund_amount: Money::new(1_000_000),
            organizer_payout_adjustment: Money::new(-950_000),
            warnings: vec![],
        }
    }

    fn draft(request: impl FnOnce(EventId) -> CompensationRequest) -> CancellationDraft {
        let impact = impact(42);
        let plan = CompensationPlanner::build_plan(&impact, &request(impact.event_id)).unwrap();
        CancellationDraft {
            event_id: impact.event_id,
            event_title: "Summer Festival".to_string(),
            reason: CancellationReason::WeatherConditions,
            reason_note: None,
            impact,
            plan,
        }
    }

    fn attendee(id: &str) -> Attendee {
        Attendee {
            user_id: UserId::new(id).unwrap(),
            name: format!("Attendee {}", id),
            email: format!("{}@example.com", id),
        }
    }

    #[test]
    fn standard_template_mentions_title_reason_and_refund() {
        let preview = NotificationPreviewer::preview(&draft(CompensationRequest::full_refund), &[]);

        assert_eq!(preview.subject, "Event cancelled: Summer Festival");
        assert!(preview.body.contains("Summer Festival has been cancelled."));
        assert!(preview.body.contains("Reason: Weather conditions."));
        assert!(preview.body.contains("full refund"));
        assert!(preview.body.contains("within 10 business days"));
        assert_eq!(preview.recipient_count, 42);
    }

    #[test]
    fn custom_message_is_appended_at_the_end() {
        let d = draft(|id| CompensationRequest {
            notification_template: NotificationTemplate::Apology,
            custom_message: Some("See you next summer!".to_string()),
            ..CompensationRequest::partial_refund(id, 0.5)
        });

        let preview = NotificationPreviewer::preview(&d, &[]);

        assert_eq!(preview.subject, "We're sorry: Summer Festival has been cancelled");
        assert!(preview.body.contains("a refund of 50% of your ticket price"));
        let custom_at = preview.body.find("See you next summer!").unwrap();
        let sign_off_at = preview.body.find("With our sincere apologies").unwrap();
        assert!(sign_off_at < custom_at);
        assert!(preview.body.ends_with("See you next summer!"));
    }

    #[test]
    fn credit_summary_shows_multiplier() {
        let d = draft(|id| CompensationRequest {
            notification_template: NotificationTemplate::Formal,
            ..CompensationRequest::event_credit(id, 1.1)
        });

        let preview = NotificationPreviewer::preview(&d, &[]);

        assert!(preview.subject.starts_with("Notice of cancellation"));
        assert!(preview.body.contains("event credit worth 110%"));
    }

    #[test]
    fn sample_recipients_are_capped_and_deduplicated() {
        let recipients: Vec<Attendee> = ["a", "a", "b", "c", "d", "e", "f", "g"]
            .iter()
            .map(|id| attendee(id))
            .collect();

        let preview = NotificationPreviewer::preview(&draft(CompensationRequest::full_refund), &recipients);

        assert_eq!(
            preview.sample_recipients,
            vec!["Attendee a", "Attendee b", "Attendee c", "Attendee d", "Attendee e"]
        );
    }

    #[test]
    fn preview_is_deterministic() {
        let d = draft(CompensationRequest::full_refund);
        assert_eq!(
            NotificationPreviewer::preview(&d, &[]),
            NotificationPreviewer::preview(&d, &[])
        );
    }
}
