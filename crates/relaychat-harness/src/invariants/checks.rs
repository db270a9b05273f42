//! Standard invariant checks.

use relaychat_core::ConnectionStatus;

use super::{Invariant, InvariantResult, ManagerSnapshot, Violation};

/// A session is tracked exactly when the manager is not disconnected.
///
/// Connecting or Connected without a session would leave events with nowhere
/// to go; Disconnected with a session would let a dead session's events
/// through.
pub struct StatusMatchesSession;

impl Invariant for StatusMatchesSession {
    fn name(&self) -> &'static str {
        "status_matches_session"
    }

    fn check(&self, state: &ManagerSnapshot) -> InvariantResult {
        let disconnected = state.status == ConnectionStatus::Disconnected;
        if disconnected == state.session.is_some() {
            return Err(Violation {
                invariant: self.name(),
                message: format!("status {} with session {:?}", state.status, state.session),
            });
        }
        Ok(())
    }
}

/// Backoff delay stays between the initial delay and the ceiling.
pub struct BackoffWithinBounds;

impl Invariant for BackoffWithinBounds {
    fn name(&self) -> &'static str {
        "backoff_within_bounds"
    }

    fn check(&self, state: &ManagerSnapshot) -> InvariantResult {
        let config = &state.backoff_config;
        let floor = config.initial_delay.min(config.max_delay);

        if state.backoff_delay < floor || state.backoff_delay > config.max_delay {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "delay {:?} outside [{:?}, {:?}]",
                    state.backoff_delay, floor, config.max_delay
                ),
            });
        }
        Ok(())
    }
}

/// A reconnection is only ever pending while disconnected.
pub struct ReconnectOnlyWhileDisconnected;

impl Invariant for ReconnectOnlyWhileDisconnected {
    fn name(&self) -> &'static str {
        "reconnect_only_while_disconnected"
    }

    fn check(&self, state: &ManagerSnapshot) -> InvariantResult {
        if state.reconnect_pending && state.status != ConnectionStatus::Disconnected {
            return Err(Violation {
                invariant: self.name(),
                message: format!("reconnect pending while {}", state.status),
            });
        }
        Ok(())
    }
}

/// After shutdown nothing is live and nothing is scheduled.
pub struct ShutdownIsQuiescent;

impl Invariant for ShutdownIsQuiescent {
    fn name(&self) -> &'static str {
        "shutdown_is_quiescent"
    }

    fn check(&self, state: &ManagerSnapshot) -> InvariantResult {
        if !state.shut_down {
            return Ok(());
        }

        if state.status != ConnectionStatus::Disconnected
            || state.session.is_some()
            || state.reconnect_pending
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "after shutdown: status {}, session {:?}, reconnect pending {}",
                    state.status, state.session, state.reconnect_pending
                ),
            });
        }
        Ok(())
    }
}
