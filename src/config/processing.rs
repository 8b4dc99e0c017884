//! Refund processing configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::ProcessingSettings;

use super::error::ValidationError;

/// Upper bound for any concurrency setting
const MAX_CONCURRENCY: usize = 256;

/// Processing configuration
///
/// Concurrency bounds respect the payment processor's rate limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Refunds in flight at once
    #[serde(default = "default_refund_concurrency")]
    pub refund_concurrency: usize,

    /// Notifications in flight at once
    #[serde(default = "default_notification_concurrency")]
    pub notification_concurrency: usize,

    /// Buffered progress updates per processing run
    #[serde(default = "default_progress_channel_capacity")]
    pub progress_channel_capacity: usize,

    /// Seconds before an abandoned `processing` claim may be taken over
    #[serde(default = "default_stale_claim_secs")]
    pub stale_claim_secs: u64,
}

impl ProcessingConfig {
    /// Validate processing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        check("refund_concurrency", self.refund_concurrency)?;
        check("notification_concurrency", self.notification_concurrency)?;
        if self.progress_channel_capacity == 0 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        if self.stale_claim_secs == 0 {
            return Err(ValidationError::InvalidStaleClaimTimeout);
        }
        Ok(())
    }

    /// Settings handed to the processor
    pub fn settings(&self) -> ProcessingSettings {
        ProcessingSettings {
            refund_concurrency: self.refund_concurrency,
            notification_concurrency: self.notification_concurrency,
            stale_claim_after: Duration::from_secs(self.stale_claim_secs),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            refund_concurrency: default_refund_concurrency(),
            notification_concurrency: default_notification_concurrency(),
            progress_channel_capacity: default_progress_channel_capacity(),
            stale_claim_secs: default_stale_claim_secs(),
        }
    }
}

fn check(field: &'static str, value: usize) -> Result<(), ValidationError> {
    if value == 0 || value > MAX_CONCURRENCY {
        return Err(ValidationError::InvalidConcurrency {
            field,
            max: MAX_CONCURRENCY,
        });
    }
    Ok(())
}

fn default_refund_concurrency() -> usize {
    8
}

fn default_notification_concurrency() -> usize {
    16
}

fn default_progress_channel_capacity() -> usize {
    64
}

fn default_stale_claim_secs() -> u64 {
    900
}
