//! Environment abstraction for deterministic testing.
//!
//! Decouples connection logic from system resources (time, randomness).
//! Enables deterministic simulation with a virtual clock and seeded RNG, and
//! production use with real system resources.

use std::{
    fmt::Debug,
    future::Future,
    ops::{Add, Sub},
    time::Duration,
};

/// Abstract environment providing time, randomness, and async primitives.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `Instant - Instant` saturates to zero instead of panicking
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use a real monotonic clock, while simulation
    /// environments use virtual time that only moves when told to.
    type Instant: Copy
        + Ord
        + Debug
        + Send
        + Sync
        + Sub<Output = Duration>
        + Add<Duration, Output = Self::Instant>;

    /// Current time (monotonic). Used for scheduling reconnection attempts.
    fn now(&self) -> Self::Instant;

    /// Milliseconds since the Unix epoch. Used to timestamp log entries.
    fn wall_clock_millis(&self) -> i64;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be used
    /// by driver code (not by the connection state machine).
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u16`.
    fn random_u16(&self) -> u16 {
        let mut bytes = [0u8; 2];
        self.random_bytes(&mut bytes);
        u16::from_be_bytes(bytes)
    }
}
