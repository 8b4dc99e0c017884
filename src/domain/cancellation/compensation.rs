//! Compensation plan and its planner.
//!
//! The planner turns the organizer's choices into a validated plan whose
//! `total_refund_amount` is derived from the impact snapshot. It never
//! writes back into the impact.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::catalog::{PaymentMethod, SoldTicket};
use crate::domain::foundation::{EventId, Money, Rate, TicketId};

use super::{CancellationError, CancellationImpact, NotificationTemplate};

/// Smallest partial refund, as a fraction of the refund total.
pub const MIN_REFUND_PERCENTAGE: f64 = 0.1;
/// Largest partial refund.
pub const MAX_REFUND_PERCENTAGE: f64 = 1.0;
/// Smallest event credit multiplier.
pub const MIN_CREDIT_MULTIPLIER: f64 = 1.0;
/// Largest event credit multiplier.
pub const MAX_CREDIT_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationType {
    FullRefund,
    PartialRefund,
    EventCredit,
}

impl fmt::Display for CompensationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompensationType::FullRefund => "full refund",
            CompensationType::PartialRefund => "partial refund",
            CompensationType::EventCredit => "event credit",
        };
        f.write_str(s)
    }
}

/// How refunds are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    /// Pushed back through the ledger for every ticket.
    Automatic,
    /// Organizer settles every refund off-platform.
    Manual,
    /// Automatic where the payment rail allows it, manual otherwise.
    Hybrid,
}

impl ProcessingMethod {
    /// Channel used for a ticket paid with `method`.
    pub fn channel_for(&self, method: PaymentMethod) -> RefundChannel {
        match self {
            ProcessingMethod::Automatic => RefundChannel::Automatic,
            ProcessingMethod::Manual => RefundChannel::Manual,
            ProcessingMethod::Hybrid if method.requires_manual_refund() => RefundChannel::Manual,
            ProcessingMethod::Hybrid => RefundChannel::Automatic,
        }
    }
}

/// Per-ticket execution channel derived from the processing method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundChannel {
    Automatic,
    Manual,
}

/// Organizer's compensation choices as submitted.
///
/// Fractions are validated by `CompensationPlanner::build_plan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationRequest {
    pub event_id: EventId,
    pub compensation_type: CompensationType,
    #[serde(default)]
    pub refund_percentage: Option<f64>,
    #[serde(default)]
    pub credit_multiplier: Option<f64>,
    pub processing_method: ProcessingMethod,
    #[serde(default)]
    pub organizer_note: Option<String>,
    pub notification_template: NotificationTemplate,
    #[serde(default)]
    pub custom_message: Option<String>,
}

impl CompensationRequest {
    /// Full automatic refund with the standard template.
    pub fn full_refund(event_id: EventId) -> Self {
        Self {
            event_id,
            compensation_type: CompensationType::FullRefund,
            refund_percentage: None,
            credit_multiplier: None,
            processing_method: ProcessingMethod::Automatic,
            organizer_note: None,
            notification_template: NotificationTemplate::Standard,
            custom_message: None,
        }
    }

    pub fn partial_refund(event_id: EventId, refund_percentage: f64) -> Self {
        Self {
            compensation_type: CompensationType::PartialRefund,
            refund_percentage: Some(refund_percentage),
            ..Self::full_refund(event_id)
        }
    }

    pub fn event_credit(event_id: EventId, credit_multiplier: f64) -> Self {
        Self {
            compensation_type: CompensationType::EventCredit,
            credit_multiplier: Some(credit_multiplier),
            ..Self::full_refund(event_id)
        }
    }
}

/// Validated compensation plan attached to a cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationPlan {
    pub compensation_type: CompensationType,
    /// Set only for partial refunds.
    pub refund_percentage: Option<Rate>,
    /// Set only for event credit.
    pub credit_multiplier: Option<Rate>,
    pub processing_method: ProcessingMethod,
    pub total_refund_amount: Money,
    pub organizer_note: Option<String>,
    pub notification_template: NotificationTemplate,
    pub custom_message: Option<String>,
}

impl CompensationPlan {
    /// Multiplier applied to the refund total.
    pub fn effective_rate(&self) -> Rate {
        match self.compensation_type {
            CompensationType::FullRefund => Rate::ONE,
            CompensationType::PartialRefund => self.refund_percentage.unwrap_or(Rate::ONE),
            CompensationType::EventCredit => self.credit_multiplier.unwrap_or(Rate::ONE),
        }
    }

    /// Splits `total_refund_amount` across tickets in proportion to what each
    /// ticket holder paid.
    ///
    /// Uses largest-remainder rounding so the allocations sum exactly to the
    /// plan total. Ties go to the earlier ticket.
    pub fn allocate(&self, tickets: &[SoldTicket]) -> Vec<RefundAllocation> {
        allocate_proportionally(self.total_refund_amount, tickets)
    }
}

/// Amount owed for one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundAllocation {
    pub ticket_id: TicketId,
    pub amount: Money,
}

fn allocate_proportionally(total: Money, tickets: &[SoldTicket]) -> Vec<RefundAllocation> {
    let paid: i128 = tickets
        .iter()
        .map(|t| i128::from(t.amount_paid.non_negative().amount()))
        .sum();
    let total_units = i128::from(total.non_negative().amount());

    if tickets.is_empty() {
        return Vec::new();
    }

    // Nothing was paid: spread evenly.
    let weights: Vec<i128> = if paid == 0 {
        vec![1; tickets.len()]
    } else {
        tickets
            .iter()
            .map(|t| i128::from(t.amount_paid.non_negative().amount()))
            .collect()
    };
    let weight_sum: i128 = weights.iter().sum();

    let mut shares: Vec<(usize, i128, i128)> = weights
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let scaled = total_units * w;
            (i, scaled / weight_sum, scaled % weight_sum)
        })
        .collect();

    let assigned: i128 = shares.iter().map(|(_, base, _)| base).sum();
    let mut leftover = total_units - assigned;

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|a, b| shares[*b].2.cmp(&shares[*a].2).then(a.cmp(b)));
    for i in order {
        if leftover == 0 {
            break;
        }
        shares[i].1 += 1;
        leftover -= 1;
    }

    shares
        .into_iter()
        .map(|(i, amount, _)| RefundAllocation {
            ticket_id: tickets[i].id,
            amount: Money::new(i64::try_from(amount).unwrap_or(i64::MAX)),
        })
        .collect()
}

/// Builds compensation plans from impact snapshots.
pub struct CompensationPlanner;

impl CompensationPlanner {
    /// Validates `request` against the bounds and derives the plan total from
    /// `impact.refund_total()`.
    ///
    /// Percentages and multipliers supplied for a compensation type that does
    /// not use them are ignored.
    pub fn build_plan(
        impact: &CancellationImpact,
        request: &CompensationRequest,
    ) -> Result<CompensationPlan, CancellationError> {
        if request.event_id != impact.event_id {
            return Err(CancellationError::invalid_compensation(
                "event_id",
                format!(
                    "impact was calculated for event {}, not {}",
                    impact.event_id, request.event_id
                ),
            ));
        }

        let (refund_percentage, credit_multiplier) = match request.compensation_type {
            CompensationType::FullRefund => (None, None),
            CompensationType::PartialRefund => {
                let rate = Self::bounded_rate(
                    "refund_percentage",
                    request.refund_percentage,
                    MIN_REFUND_PERCENTAGE,
                    MAX_REFUND_PERCENTAGE,
                )?;
                (Some(rate), None)
            }
            CompensationType::EventCredit => {
                let rate = Self::bounded_rate(
                    "credit_multiplier",
                    request.credit_multiplier,
                    MIN_CREDIT_MULTIPLIER,
                    MAX_CREDIT_MULTIPLIER,
                )?;
                (None, Some(rate))
            }
        };

        let refund_total = impact.refund_total();
        let total_refund_amount = match (refund_percentage, credit_multiplier) {
            (Some(rate), _) | (_, Some(rate)) => refund_total.apply_rate(rate),
            (None, None) => refund_total,
        };

        Ok(CompensationPlan {
            compensation_type: request.compensation_type,
            refund_percentage,
            credit_multiplier,
            processing_method: request.processing_method,
            total_refund_amount,
            organizer_note: non_blank(&request.organizer_note),
            notification_template: request.notification_template,
            custom_message: non_blank(&request.custom_message),
        })
    }

    fn bounded_rate(
        field: &str,
        value: Option<f64>,
        min: f64,
        max: f64,
    ) -> Result<Rate, CancellationError> {
        let value = value.ok_or_else(|| {
            CancellationError::invalid_compensation(field, "required for this compensation type")
        })?;
        if !value.is_finite() || value < min || value > max {
            return Err(CancellationError::invalid_compensation(
                field,
                format!("must be between {} and {}, got {}", min, max, value),
            ));
        }
        Rate::from_fraction(value)
            .map_err(|e| CancellationError::invalid_compensation(field, e.to_string()))
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
