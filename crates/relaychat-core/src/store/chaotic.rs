//! Chaotic storage wrapper for fault injection testing
//!
//! Storage wrapper that randomly fails operations to exercise the best-effort
//! persistence paths. Used for chaos testing to ensure quota errors, disk
//! failures and the like never reach the connection manager.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use super::{Storage, StorageError};

/// Chaotic storage wrapper that randomly injects failures
///
/// Delegates to an underlying storage implementation but fails operations
/// based on a configured failure rate. Failed writes do not reach the inner
/// storage.
#[derive(Clone, Debug)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Number of injected failures
    failures: Arc<AtomicUsize>,
}

/// Simple deterministic RNG for chaos injection
///
/// Linear congruential generator: fast and reproducible with the same seed.
#[derive(Debug)]
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random value [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Create a new chaotic storage wrapper.
    ///
    /// `failure_rate` is clamped to [0.0, 1.0].
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos.
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying storage (for checking state after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of operations that were failed on purpose.
    pub fn injected_failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    fn check(&self, operation: &'static str) -> Result<(), StorageError> {
        let roll = match self.rng.lock() {
            Ok(mut rng) => rng.next(),
            Err(_) => return Err(StorageError::Io("chaotic rng lock poisoned".into())),
        };

        if roll < self.failure_rate {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(StorageError::Injected { operation });
        }

        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check("get")?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check("set")?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check("remove")?;
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    #[test]
    fn zero_rate_never_fails() {
        let storage = ChaoticStorage::new(MemoryStorage::new(), 0.0);
        for i in 0..100 {
            storage.set("k", &i.to_string()).unwrap();
        }
        assert_eq!(storage.injected_failures(), 0);
        assert_eq!(storage.inner().get("k").unwrap(), Some("99".to_string()));
    }

    #[test]
    fn full_rate_always_fails() {
        let storage = ChaoticStorage::new(MemoryStorage::new(), 1.0);
        assert_eq!(storage.set("k", "v"), Err(StorageError::Injected { operation: "set" }));
        assert_eq!(storage.get("k"), Err(StorageError::Injected { operation: "get" }));
        assert!(storage.inner().is_empty());
        assert_eq!(storage.injected_failures(), 2);
    }

    #[test]
    fn same_seed_same_failures() {
        let run = |seed| {
            let storage = ChaoticStorage::with_seed(MemoryStorage::new(), 0.5, seed);
            (0..64).map(|_| storage.set("k", "v").is_err()).collect::<Vec<_>>()
        };

        assert_eq!(run(7), run(7));
    }
}
