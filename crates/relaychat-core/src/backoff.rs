//! Reconnection policy.
//!
//! Exponential backoff with a ceiling. The delay grows by a constant factor on
//! every failed or closed connection and snaps back to the initial value on
//! every successful one.
//!
//! ```text
//! failure #   1      2      3      4      5      6      7      8
//! delay (ms)  1000   1600   2560   4096   6554   10486  15000  15000
//! ```

use std::time::Duration;

use crate::ConfigError;

/// Delay before the first reconnection attempt.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1_000);

/// Growth factor applied after each consecutive failure.
pub const DEFAULT_MULTIPLIER: f64 = 1.6;

/// Upper bound on the delay between attempts.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(15_000);

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Delay used after a reset.
    pub initial_delay: Duration,
    /// Factor applied to the previous delay.
    pub multiplier: f64,
    /// Ceiling the delay never exceeds.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl BackoffConfig {
    /// Check the parameters describe a non-decreasing, bounded schedule.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InitialDelayTooSmall` if initial delay is under 1ms
    /// - `ConfigError::InvalidMultiplier` if multiplier is below 1.0 or NaN
    /// - `ConfigError::CeilingBelowInitial` if max delay < initial delay
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_delay < Duration::from_millis(1) {
            return Err(ConfigError::InitialDelayTooSmall(self.initial_delay));
        }

        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::InvalidMultiplier(self.multiplier));
        }

        if self.max_delay < self.initial_delay {
            return Err(ConfigError::CeilingBelowInitial {
                initial: self.initial_delay,
                max: self.max_delay,
            });
        }

        Ok(())
    }
}

/// Delay that follows `previous`: `min(previous * multiplier, max_delay)`.
///
/// Computed in whole milliseconds, rounded to nearest.
pub fn next_delay(previous: Duration, config: &BackoffConfig) -> Duration {
    let scaled = (previous.as_millis() as f64 * config.multiplier).round();
    let ceiling = config.max_delay.as_millis() as f64;
    Duration::from_millis(scaled.min(ceiling) as u64)
}

/// Backoff state owned by the connection manager.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    /// Create a backoff positioned at the initial delay.
    pub fn new(config: BackoffConfig) -> Self {
        Self { current: config.initial_delay.min(config.max_delay), config }
    }

    /// Delay the next failure will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Parameters in use.
    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Consume the current delay for a failure and grow it for the next one.
    ///
    /// Returns the delay to wait now.
    pub fn advance(&mut self) -> Duration {
        let delay = self.current;
        self.current = next_delay(delay, &self.config);

        debug_assert!(self.current >= delay || self.current == self.config.max_delay);
        debug_assert!(self.current <= self.config.max_delay);

        delay
    }

    /// Return to the initial delay after a successful connection.
    pub fn reset(&mut self) -> Duration {
        self.current = self.config.initial_delay.min(self.config.max_delay);
        self.current
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
