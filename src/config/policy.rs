//! Cancellation business rules configuration
//!
//! Fee rates, VIP classification and refund processing times are contract
//! terms, so they are read from the environment rather than compiled in.

use serde::Deserialize;

use crate::domain::cancellation::{ImpactPolicy, ProcessingTimeEstimate};
use crate::domain::catalog::PaymentMethod;
use crate::domain::foundation::{Money, Rate};

use super::error::ValidationError;

/// Impact policy configuration
///
/// Rates are basis points (10000 = 100%). Processing times are
/// `"min-max"` business days.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Platform fee on a normal payout
    #[serde(default = "default_platform_fee_bps")]
    pub platform_fee_bps: u32,

    /// Whether the platform returns its fee on cancellation
    #[serde(default = "default_waive_platform_fee")]
    pub waive_platform_fee: bool,

    /// Estimated processing cost deducted from refunds
    #[serde(default)]
    pub processing_fee_bps: u32,

    /// Comma-separated keywords marking VIP ticket types
    #[serde(default = "default_vip_keywords")]
    pub vip_keywords: String,

    /// VIP share of sold tickets above which a warning is raised
    #[serde(default = "default_vip_share_warning_bps")]
    pub vip_share_warning_bps: u32,

    /// Net refund (minor units) above which a critical warning is raised
    #[serde(default = "default_large_refund_threshold")]
    pub large_refund_threshold: i64,

    #[serde(default = "default_card_days")]
    pub card_processing_days: String,

    #[serde(default = "default_e_wallet_days")]
    pub e_wallet_processing_days: String,

    #[serde(default = "default_bank_transfer_days")]
    pub bank_transfer_processing_days: String,

    #[serde(default = "default_cash_days")]
    pub cash_processing_days: String,

    #[serde(default = "default_other_days")]
    pub other_processing_days: String,
}

impl PolicyConfig {
    /// Validate policy configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.to_impact_policy().map(|_| ())
    }

    /// Convert into the domain policy
    pub fn to_impact_policy(&self) -> Result<ImpactPolicy, ValidationError> {
        let vip_keywords = self.vip_keyword_list();
        if vip_keywords.is_empty() {
            return Err(ValidationError::NoVipKeywords);
        }
        if self.large_refund_threshold <= 0 {
            return Err(ValidationError::InvalidRefundThreshold);
        }

        Ok(ImpactPolicy {
            platform_fee_rate: rate("platform_fee_bps", self.platform_fee_bps)?,
            waive_platform_fee: self.waive_platform_fee,
            processing_fee_rate: rate("processing_fee_bps", self.processing_fee_bps)?,
            vip_keywords,
            vip_share_warning: rate("vip_share_warning_bps", self.vip_share_warning_bps)?,
            large_refund_threshold: Money::new(self.large_refund_threshold),
            processing_times: vec![
                (PaymentMethod::Card, days("card", &self.card_processing_days)?),
                (PaymentMethod::EWallet, days("e_wallet", &self.e_wallet_processing_days)?),
                (
                    PaymentMethod::BankTransfer,
                    days("bank_transfer", &self.bank_transfer_processing_days)?,
                ),
                (PaymentMethod::Cash, days("cash", &self.cash_processing_days)?),
                (PaymentMethod::Other, days("other", &self.other_processing_days)?),
            ],
        })
    }

    /// VIP keywords as a vector
    pub fn vip_keyword_list(&self) -> Vec<String> {
        self.vip_keywords
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: default_platform_fee_bps(),
            waive_platform_fee: default_waive_platform_fee(),
            processing_fee_bps: 0,
            vip_keywords: default_vip_keywords(),
            vip_share_warning_bps: default_vip_share_warning_bps(),
            large_refund_threshold: default_large_refund_threshold(),
            card_processing_days: default_card_days(),
            e_wallet_processing_days: default_e_wallet_days(),
            bank_transfer_processing_days: default_bank_transfer_days(),
            cash_processing_days: default_cash_days(),
            other_processing_days: default_other_days(),
        }
    }
}

fn rate(field: &'static str, bps: u32) -> Result<Rate, ValidationError> {
    if bps > Rate::SCALE {
        return Err(ValidationError::InvalidRate { field });
    }
    Ok(Rate::from_basis_points(bps))
}

fn days(method: &'static str, value: &str) -> Result<ProcessingTimeEstimate, ValidationError> {
    let invalid = || ValidationError::InvalidProcessingTime {
        method,
        value: value.to_string(),
    };
    let (min, max) = match value.split_once('-') {
        Some((min, max)) => (min.trim(), max.trim()),
        None => (value.trim(), value.trim()),
    };
    let min: u16 = min.parse().map_err(|_| invalid())?;
    let max: u16 = max.parse().map_err(|_| invalid())?;
    if min > max {
        return Err(invalid());
    }
    Ok(ProcessingTimeEstimate::new(min, max))
}

fn default_platform_fee_bps() -> u32 {
    500
}

fn default_waive_platform_fee() -> bool {
    true
}

fn default_vip_keywords() -> String {
    "vip,premium".to_string()
}

fn default_vip_share_warning_bps() -> u32 {
    2_000
}

fn default_large_refund_threshold() -> i64 {
    100_000_000
}

fn default_card_days() -> String {
    "5-10".to_string()
}

fn default_e_wallet_days() -> String {
    "1-3".to_string()
}

fn default_bank_transfer_days() -> String {
    "3-5".to_string()
}

fn default_cash_days() -> String {
    "7-14".to_string()
}

fn default_other_days() -> String {
    "5-10".to_string()
}
