//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Rate {field} must be between 0 and 10000 basis points")]
    InvalidRate { field: &'static str },

    #[error("At least one VIP keyword is required")]
    NoVipKeywords,

    #[error("Large refund threshold must be positive")]
    InvalidRefundThreshold,

    #[error("Invalid processing time for {method}: {value} (expected \"min-max\" days)")]
    InvalidProcessingTime { method: &'static str, value: String },

    #[error("{field} must be between 1 and {max}")]
    InvalidConcurrency { field: &'static str, max: usize },

    #[error("Progress channel capacity must be positive")]
    InvalidChannelCapacity,

    #[error("Stale claim timeout must be positive")]
    InvalidStaleClaimTimeout,
}
