//! Financial and attendee impact of cancelling an event.
//!
//! `ImpactCalculator` is a pure function of the event, the ledger's
//! payment-method distribution and the configured `ImpactPolicy`. Calling it
//! twice with the same inputs yields identical results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::catalog::{Event, PaymentDistribution, PaymentMethod};
use crate::domain::foundation::{EventId, Money, Rate, TicketTypeId};

/// Typical number of business days before a refund reaches the attendee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimeEstimate {
    pub min_days: u16,
    pub max_days: u16,
}

impl ProcessingTimeEstimate {
    pub const fn new(min_days: u16, max_days: u16) -> Self {
        Self { min_days, max_days }
    }
}

impl fmt::Display for ProcessingTimeEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min_days == self.max_days {
            write!(f, "{} business days", self.min_days)
        } else {
            write!(f, "{}-{} business days", self.min_days, self.max_days)
        }
    }
}

/// Business rules behind the impact figures.
///
/// Loaded from configuration; nothing here is hardcoded at call sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactPolicy {
    /// Share of gross revenue the platform keeps on a normal payout.
    pub platform_fee_rate: Rate,
    /// Platform returns its fee when an event is cancelled.
    pub waive_platform_fee: bool,
    /// Estimated payment processing cost deducted from refunds.
    pub processing_fee_rate: Rate,
    /// Ticket type names containing any of these (case-insensitive) count as VIP.
    pub vip_keywords: Vec<String>,
    /// Warn when the VIP share of sold tickets exceeds this rate.
    pub vip_share_warning: Rate,
    /// Warn (critical) when the net refund reaches this amount.
    pub large_refund_threshold: Money,
    /// Per-method refund processing time.
    pub processing_times: Vec<(PaymentMethod, ProcessingTimeEstimate)>,
}

impl ImpactPolicy {
    /// Processing time for a method, falling back to the `Other` entry.
    pub fn processing_time_for(&self, method: PaymentMethod) -> ProcessingTimeEstimate {
        self.processing_times
            .iter()
            .find(|(m, _)| *m == method)
            .or_else(|| {
                self.processing_times
                    .iter()
                    .find(|(m, _)| *m == PaymentMethod::Other)
            })
            .map(|(_, estimate)| *estimate)
            .unwrap_or(ProcessingTimeEstimate::new(5, 10))
    }

    /// Returns true if a ticket type name is classified as VIP.
    pub fn is_vip(&self, ticket_type_name: &str) -> bool {
        let name = ticket_type_name.to_lowercase();
        self.vip_keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .any(|k| name.contains(&k.trim().to_lowercase()))
    }
}

impl Default for ImpactPolicy {
    fn default() -> Self {
        Self {
            platform_fee_rate: Rate::from_basis_points(500),
            waive_platform_fee: true,
            processing_fee_rate: Rate::ZERO,
            vip_keywords: vec!["vip".to_string(), "premium".to_string()],
            vip_share_warning: Rate::from_basis_points(2_000),
            large_refund_threshold: Money::new(100_000_000),
            processing_times: vec![
                (PaymentMethod::Card, ProcessingTimeEstimate::new(5, 10)),
                (PaymentMethod::EWallet, ProcessingTimeEstimate::new(1, 3)),
                (PaymentMethod::BankTransfer, ProcessingTimeEstimate::new(3, 5)),
                (PaymentMethod::Cash, ProcessingTimeEstimate::new(7, 14)),
                (PaymentMethod::Other, ProcessingTimeEstimate::new(5, 10)),
            ],
        }
    }
}

/// Revenue for one ticket type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketTypeBreakdown {
    pub ticket_type_id: TicketTypeId,
    pub name: String,
    pub sold: u32,
    pub price: Money,
    pub revenue: Money,
    pub is_vip: bool,
    pub is_sold_out: bool,
}

/// Tickets paid with one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodBreakdown {
    pub method: PaymentMethod,
    pub ticket_count: u32,
    pub processing_time: ProcessingTimeEstimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Info,
    Warning,
    Critical,
}

/// Advisory shown to the organizer before confirming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationWarning {
    pub severity: WarningSeverity,
    pub title: String,
    pub description: String,
}

impl CancellationWarning {
    fn new(severity: WarningSeverity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Read-only snapshot of what cancelling an event costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationImpact {
    pub event_id: EventId,
    pub event_title: String,
    pub tickets_sold: u32,
    pub attendees_count: u32,
    pub vip_tickets: u32,
    pub ticket_type_breakdown: Vec<TicketTypeBreakdown>,
    pub payment_method_breakdown: Vec<PaymentMethodBreakdown>,
    pub gross_revenue: Money,
    pub platform_fees_retained: Money,
    pub processing_fees_estimate: Money,
    pub net_refund_amount: Money,
    /// Change to the organizer's payout (zero or negative).
    pub organizer_payout_adjustment: Money,
    pub warnings: Vec<CancellationWarning>,
}

impl CancellationImpact {
    /// Amount compensation is computed from.
    pub fn refund_total(&self) -> Money {
        self.net_refund_amount
    }

    pub fn has_critical_warnings(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| w.severity == WarningSeverity::Critical)
    }
}

/// Computes `CancellationImpact` values.
#[derive(Debug, Clone, Default)]
pub struct ImpactCalculator {
    policy: ImpactPolicy,
}

impl ImpactCalculator {
    pub fn new(policy: ImpactPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ImpactPolicy {
        &self.policy
    }

    /// Computes the impact of cancelling `event`.
    pub fn calculate(&self, event: &Event, distribution: &PaymentDistribution) -> CancellationImpact {
        let ticket_type_breakdown: Vec<TicketTypeBreakdown> = event
            .ticket_types
            .iter()
            .map(|t| TicketTypeBreakdown {
                ticket_type_id: t.id,
                name: t.name.clone(),
                sold: t.sold,
                price: t.price,
                revenue: t.revenue(),
                is_vip: self.policy.is_vip(&t.name),
                is_sold_out: t.is_sold_out(),
            })
            .collect();

        let tickets_sold: u32 = ticket_type_breakdown.iter().map(|t| t.sold).sum();
        let vip_tickets: u32 = ticket_type_breakdown
            .iter()
            .filter(|t| t.is_vip)
            .map(|t| t.sold)
            .sum();
        let gross_revenue: Money = ticket_type_breakdown.iter().map(|t| t.revenue).sum();

        let payment_method_breakdown = self.reconcile_methods(tickets_sold, distribution);

        let platform_fee = gross_revenue.apply_rate(self.policy.platform_fee_rate);
        let platform_fees_retained = if self.policy.waive_platform_fee {
            Money::ZERO
        } else {
            platform_fee
        };
        let processing_fees_estimate = gross_revenue.apply_rate(self.policy.processing_fee_rate);
        let net_refund_amount =
            (gross_revenue - platform_fees_retained - processing_fees_estimate).non_negative();

        // Organizer loses the payout they would have received for these sales.
        let organizer_payout_adjustment = Money::ZERO - (gross_revenue - platform_fee).non_negative();

        let attendees_count = if distribution.attendees_count > 0 {
            distribution.attendees_count.min(tickets_sold)
        } else {
            tickets_sold
        };

        let mut impact = CancellationImpact {
            event_id: event.id,
            event_title: event.title.clone(),
            tickets_sold,
            attendees_count,
            vip_tickets,
            ticket_type_breakdown,
            payment_method_breakdown,
            gross_revenue,
            platform_fees_retained,
            processing_fees_estimate,
            net_refund_amount,
            organizer_payout_adjustment,
            warnings: Vec::new(),
        };
        impact.warnings = self.warnings_for(&impact);
        impact
    }

    /// Fits the ledger distribution to `tickets_sold`.
    ///
    /// Counts beyond `tickets_sold` are dropped in breakdown order and any
    /// shortfall is attributed to `Other`, so the breakdown always sums to
    /// `tickets_sold`.
    fn reconcile_methods(
        &self,
        tickets_sold: u32,
        distribution: &PaymentDistribution,
    ) -> Vec<PaymentMethodBreakdown> {
        let mut remaining = tickets_sold;
        let mut counts: Vec<(PaymentMethod, u32)> = Vec::new();

        for method in PaymentMethod::ALL {
            let reported: u32 = distribution
                .by_method
                .iter()
                .filter(|c| c.method == method)
                .map(|c| c.ticket_count)
                .sum();
            let taken = reported.min(remaining);
            remaining -= taken;
            counts.push((method, taken));
        }

        if remaining > 0 {
            if let Some(other) = counts.iter_mut().find(|(m, _)| *m == PaymentMethod::Other) {
                other.1 += remaining;
            }
        }

        counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(method, ticket_count)| PaymentMethodBreakdown {
                method,
                ticket_count,
                processing_time: self.policy.processing_time_for(method),
            })
            .collect()
    }

    fn warnings_for(&self, impact: &CancellationImpact) -> Vec<CancellationWarning> {
        let mut warnings = Vec::new();

        if impact.tickets_sold == 0 {
            warnings.push(CancellationWarning::new(
                WarningSeverity::Info,
                "No tickets sold",
                "No refunds or attendee notifications are required.",
            ));
            return warnings;
        }

        // vip / sold > threshold, in integer basis points
        let vip_bps = u64::from(impact.vip_tickets) * u64::from(Rate::SCALE);
        let threshold = u64::from(self.policy.vip_share_warning.basis_points())
            * u64::from(impact.tickets_sold);
        if impact.vip_tickets > 0 && vip_bps > threshold {
            warnings.push(CancellationWarning::new(
                WarningSeverity::Warning,
                "VIP tickets will be hardest to refund",
                format!(
                    "{} of {} tickets sold are VIP tickets, above the {} threshold.",
                    impact.vip_tickets, impact.tickets_sold, self.policy.vip_share_warning
                ),
            ));
        }

        let sold_out: Vec<&str> = impact
            .ticket_type_breakdown
            .iter()
            .filter(|t| t.is_sold_out)
            .map(|t| t.name.as_str())
            .collect();
        if !sold_out.is_empty() {
            warnings.push(CancellationWarning::new(
                WarningSeverity::Warning,
                "Sold-out ticket types",
                format!(
                    "{} sold out. Expect more refund requests and resale disputes.",
                    sold_out.join(", ")
                ),
            ));
        }

        let manual: u32 = impact
            .payment_method_breakdown
            .iter()
            .filter(|m| m.method.requires_manual_refund())
            .map(|m| m.ticket_count)
            .sum();
        if manual > 0 {
            warnings.push(CancellationWarning::new(
                WarningSeverity::Warning,
                "Manual refunds required",
                format!(
                    "{} tickets were paid by cash or bank transfer and must be refunded manually.",
                    manual
                ),
            ));
        }

        if impact.net_refund_amount >= self.policy.large_refund_threshold {
            warnings.push(CancellationWarning::new(
                WarningSeverity::Critical,
                "Large refund volume",
                format!(
                    "Refunds total {}, at or above the {} review threshold.",
                    impact.net_refund_amount, self.policy.large_refund_threshold
                ),
            ));
        }

        warnings
    }
}
