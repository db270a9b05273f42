//! Simulated environment with a virtual clock and seeded RNG.
//!
//! Time only moves when a test calls [`SimEnv::advance`] or when a
//! [`SimEnv::sleep`] future is polled. Given the same seed, every run draws
//! the same random bytes, so guest names and any other randomness repeat
//! exactly.

use std::{
    future::Future,
    ops::{Add, Sub},
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use relaychat_core::Environment;

/// Wall-clock time at virtual time zero (2023-11-14T22:13:20Z).
pub const EPOCH_MILLIS: i64 = 1_700_000_000_000;

/// Point on the virtual clock, measured from the simulation start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time since the simulation started.
    pub fn since_start(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

/// Deterministic environment for simulation.
///
/// Clones share the clock and the RNG.
#[derive(Debug, Clone)]
pub struct SimEnv {
    clock: Arc<Mutex<Duration>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl SimEnv {
    /// Create an environment with seed 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment with an explicit seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: Arc::new(Mutex::new(Duration::ZERO)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, by: Duration) {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock = clock.saturating_add(by);
    }

    /// Time since the simulation started.
    pub fn elapsed(&self) -> Duration {
        *self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.elapsed())
    }

    fn wall_clock_millis(&self) -> i64 {
        EPOCH_MILLIS + self.elapsed().as_millis() as i64
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        SimSleep { env: self.clone(), duration, elapsed: false }
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}

/// Sleep that jumps the virtual clock on first poll, then yields once.
struct SimSleep {
    env: SimEnv,
    duration: Duration,
    elapsed: bool,
}

impl Future for SimSleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.elapsed {
            return Poll::Ready(());
        }

        self.env.advance(self.duration);
        self.elapsed = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
