//! Configuration errors.

use std::time::Duration;

use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Initial reconnection delay must be at least one millisecond.
    #[error("initial delay must be at least 1ms, got {0:?}")]
    InitialDelayTooSmall(Duration),

    /// Backoff multiplier must not shrink the delay.
    #[error("multiplier must be a finite value >= 1.0, got {0}")]
    InvalidMultiplier(f64),

    /// Ceiling must not be below the initial delay.
    #[error("max delay {max:?} is below initial delay {initial:?}")]
    CeilingBelowInitial {
        /// Configured initial delay.
        initial: Duration,
        /// Configured ceiling.
        max: Duration,
    },

    /// Endpoint URL is empty.
    #[error("endpoint url must not be empty")]
    EmptyUrl,
}
