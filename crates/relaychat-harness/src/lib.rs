//! Deterministic simulation harness for Relaychat testing.
//!
//! In-memory implementations of the Environment, Transport and Frontend
//! traits for deterministic, reproducible tests of the connection manager and
//! the runtime: a virtual clock with a seeded RNG, a scripted transport whose
//! sessions open, fail and deliver frames on command, and a frontend driven
//! over a channel.
//!
//! # Invariant Testing
//!
//! The `invariants` module verifies properties that must hold after every
//! step of the connection manager. Use [`InvariantRegistry::standard()`] for
//! the common set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_env;
pub mod sim_frontend;
pub mod sim_transport;

pub use invariants::{
    BackoffWithinBounds, Invariant, InvariantRegistry, InvariantResult, ManagerSnapshot,
    ReconnectOnlyWhileDisconnected, ShutdownIsQuiescent, StatusMatchesSession, Violation,
};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_frontend::{FrontendHandle, RenderedView, SimFrontend, SimFrontendError};
pub use sim_transport::{SimSession, SimTransport};
