//! Observable manager state for invariant checking.
//!
//! Invariants operate on snapshots rather than live state so a check never
//! sees a half-applied transition.

use std::time::Duration;

use relaychat_core::{
    BackoffConfig, ConnectionManager, ConnectionStatus, Environment, SessionId, Storage,
};

/// Snapshot of one connection manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerSnapshot {
    /// Connection status.
    pub status: ConnectionStatus,
    /// Session whose events are accepted.
    pub session: Option<SessionId>,
    /// Whether a reconnection is scheduled.
    pub reconnect_pending: bool,
    /// Delay the next failure will wait.
    pub backoff_delay: Duration,
    /// Backoff parameters.
    pub backoff_config: BackoffConfig,
    /// Whether `shutdown()` has been called.
    pub shut_down: bool,
    /// Length of the message log.
    pub message_count: usize,
}

impl ManagerSnapshot {
    /// Capture the observable state of `manager`.
    pub fn capture<E: Environment, S: Storage>(manager: &ConnectionManager<E, S>) -> Self {
        Self {
            status: manager.status(),
            session: manager.current_session(),
            reconnect_pending: manager.reconnect_deadline().is_some(),
            backoff_delay: manager.backoff().current(),
            backoff_config: *manager.backoff().config(),
            shut_down: manager.is_shut_down(),
            message_count: manager.messages().len(),
        }
    }

    /// State of a freshly created manager with default backoff.
    pub fn idle() -> Self {
        let backoff_config = BackoffConfig::default();
        Self {
            status: ConnectionStatus::Disconnected,
            session: None,
            reconnect_pending: false,
            backoff_delay: backoff_config.initial_delay,
            backoff_config,
            shut_down: false,
            message_count: 0,
        }
    }
}
