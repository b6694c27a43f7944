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

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid socket address: {0}")]
    InvalidAddress(String),

    #[error("Channel capacity must be positive")]
    InvalidChannelCapacity,

    #[error("Poll interval for {0} must be positive")]
    InvalidPollInterval(&'static str),

    #[error("Pull timeout must be shorter than the shortest poll interval ({0} ms)")]
    PullTimeoutTooLong(u64),

    #[error("{0} must be positive")]
    InvalidThreshold(&'static str),

    #[error("Reconnect backoff must start above zero and not exceed its cap")]
    InvalidBackoff,
}
