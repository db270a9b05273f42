//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties of the connection manager that must hold after
//! every operation, whatever sequence of events led there.
//!
//! # Architecture
//!
//! Observable manager state is captured into a [`ManagerSnapshot`], then every
//! registered [`Invariant`] is checked against it. Violations carry enough
//! context to debug a failing random sequence.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.assert_all(&ManagerSnapshot::capture(&manager), "after connect");
//! ```

mod checks;
mod snapshot;

pub use checks::{
    BackoffWithinBounds, ReconnectOnlyWhileDisconnected, ShutdownIsQuiescent,
    StatusMatchesSession,
};
pub use snapshot::ManagerSnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property checked against manager state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    fn check(&self, state: &ManagerSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard connection invariants.
    ///
    /// Includes:
    /// - [`StatusMatchesSession`]: a session exists exactly when not
    ///   disconnected
    /// - [`BackoffWithinBounds`]: the delay stays between initial and ceiling
    /// - [`ReconnectOnlyWhileDisconnected`]: no timer while a session is live
    /// - [`ShutdownIsQuiescent`]: nothing pending after shutdown
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(StatusMatchesSession);
        registry.add(BackoffWithinBounds);
        registry.add(ReconnectOnlyWhileDisconnected);
        registry.add(ShutdownIsQuiescent);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants, returning every violation found.
    pub fn check_all(&self, state: &ManagerSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &ManagerSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
