//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` uses tokio's monotonic clock for reconnect deadlines, the
//! system wall clock for message timestamps, and the OS RNG for guest names.
//! Using tokio's `Instant` means runtime tests can pause and advance time.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use relaychat_core::Environment;

/// Production environment using system time and OS randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn wall_clock_millis(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_millis() as i64,
            Err(e) => {
                tracing::warn!(error = %e, "system clock is before the Unix epoch");
                0
            },
        }
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        if let Err(e) = getrandom::fill(buffer) {
            tracing::warn!(error = %e, "OS RNG unavailable, using clock-derived bytes");
            let seed = self.wall_clock_millis().to_le_bytes();
            for (byte, fill) in buffer.iter_mut().zip(seed.iter().cycle()) {
                *byte = *fill;
            }
        }
    }
}
