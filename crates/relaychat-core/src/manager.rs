//! Connection lifecycle state machine.
//!
//! Owns every piece of mutable connection state: status, backoff, the current
//! session, the pending reconnect deadline and the message log. Uses the
//! action pattern: methods return [`ManagerAction`]s for the driver to
//! execute, keeping the state machine free of I/O.
//!
//! # State Machine
//!
//! ```text
//!                  connect()                 Opened
//! ┌──────────────┐ ─────────> ┌────────────┐ ───────> ┌───────────┐
//! │ Disconnected │            │ Connecting │          │ Connected │
//! └──────────────┘ <───────── └────────────┘          └───────────┘
//!        ^  │     Closed/Errored     ^                      │
//!        │  │                        │ connect()            │
//!        │  └── deadline passed ─────┘ change_endpoint()    │
//!        └──────────────────── Closed/Errored ──────────────┘
//! ```
//!
//! Every failure schedules exactly one reconnection. A second failure while a
//! reconnection is already pending is a no-op. `shutdown()` is terminal.

use std::{fmt, time::Duration};

use crate::{
    Backoff, BackoffConfig, EndpointConfig, Environment, Message, MessageStore, SessionEvent,
    SessionEventKind, SessionId, Storage, config, decode_inbound, encode_chat, message::Inbound,
};

/// Connection status exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No live session. A reconnection may be pending.
    Disconnected,
    /// Session opened, waiting for the transport to report success.
    Connecting,
    /// Session established.
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(label)
    }
}

/// Actions returned by the connection manager.
///
/// The driver executes these in order:
/// - `CloseSession`: tear down the transport session (idempotent)
/// - `OpenSession`: start a new transport session tagged with `session`
/// - `Transmit`: send a text frame on `session` if it is still live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerAction {
    /// Open a transport session to `url`.
    OpenSession {
        /// Id the transport must tag its events with.
        session: SessionId,
        /// Relay URL.
        url: String,
    },

    /// Close a transport session.
    CloseSession {
        /// Session to close.
        session: SessionId,
    },

    /// Send a text payload.
    Transmit {
        /// Session to send on.
        session: SessionId,
        /// Encoded wire payload.
        payload: String,
    },
}

/// Connection manager.
///
/// Composes the reconnection policy, the single active session and the
/// message log into one state machine. Generic over the [`Environment`] for
/// time and randomness and over the [`Storage`] backend of the log.
#[derive(Debug)]
pub struct ConnectionManager<E: Environment, S: Storage> {
    /// Time and randomness source.
    env: E,
    /// Current status.
    status: ConnectionStatus,
    /// Relay URL and display name.
    endpoint: EndpointConfig,
    /// Reconnection delay state.
    backoff: Backoff,
    /// Session whose events are accepted. `None` while disconnected.
    session: Option<SessionId>,
    /// Id handed to the next session.
    next_session: u64,
    /// Pending reconnection. At most one.
    reconnect_at: Option<E::Instant>,
    /// Conversation log.
    store: MessageStore<S>,
    /// Terminal flag set by `shutdown()`.
    shut_down: bool,
}

impl<E: Environment, S: Storage> ConnectionManager<E, S> {
    /// Create a disconnected manager, rehydrating the log from `storage`.
    pub fn new(env: E, storage: S, endpoint: EndpointConfig, backoff: BackoffConfig) -> Self {
        Self {
            env,
            status: ConnectionStatus::Disconnected,
            endpoint,
            backoff: Backoff::new(backoff),
            session: None,
            next_session: 1,
            reconnect_at: None,
            store: MessageStore::load(storage),
            shut_down: false,
        }
    }

    /// Open a fresh session, tearing down any existing one first.
    ///
    /// Cancels any pending reconnection. No-op after `shutdown()`.
    pub fn connect(&mut self) -> Vec<ManagerAction> {
        if self.shut_down {
            return Vec::new();
        }

        let mut actions = Vec::with_capacity(2);
        if let Some(previous) = self.session.take() {
            actions.push(ManagerAction::CloseSession { session: previous });
        }

        self.reconnect_at = None;

        let session = SessionId(self.next_session);
        self.next_session += 1;
        self.session = Some(session);
        self.status = ConnectionStatus::Connecting;

        tracing::info!(%session, url = %self.endpoint.url, "connecting");
        actions.push(ManagerAction::OpenSession { session, url: self.endpoint.url.clone() });
        actions
    }

    /// Process a transport event.
    ///
    /// Events from any session other than the current one are ignored.
    pub fn handle_session_event(&mut self, event: SessionEvent) -> Vec<ManagerAction> {
        if self.shut_down {
            return Vec::new();
        }

        if self.session != Some(event.session) {
            tracing::debug!(session = %event.session, "ignoring event from stale session");
            return Vec::new();
        }

        match event.kind {
            SessionEventKind::Opened => {
                self.handle_opened(event.session);
                Vec::new()
            },
            SessionEventKind::MessageReceived(raw) => {
                self.handle_message(raw);
                Vec::new()
            },
            SessionEventKind::Closed(reason) => self.handle_failure(event.session, "closed", &reason),
            SessionEventKind::Errored(reason) => {
                self.handle_failure(event.session, "errored", &reason)
            },
        }
    }

    /// Fire the pending reconnection if its deadline has passed.
    pub fn tick(&mut self) -> Vec<ManagerAction> {
        match self.reconnect_at {
            Some(deadline) if self.env.now() >= deadline => {
                tracing::debug!("reconnect deadline reached");
                self.connect()
            },
            _ => Vec::new(),
        }
    }

    /// Send a chat message.
    ///
    /// Only while connected and only for text that is non-empty after
    /// trimming. The message is appended to the log whether or not the
    /// transport manages to deliver it.
    pub fn send(&mut self, text: &str) -> Vec<ManagerAction> {
        let text = text.trim();
        if self.shut_down || self.status != ConnectionStatus::Connected || text.is_empty() {
            tracing::debug!(status = %self.status, "send rejected");
            return Vec::new();
        }

        let Some(session) = self.session else {
            return Vec::new();
        };

        let message =
            Message::outbound(self.endpoint.display_name.as_str(), text, self.env.wall_clock_millis());

        let mut actions = Vec::with_capacity(1);
        match encode_chat(&message) {
            Ok(payload) => actions.push(ManagerAction::Transmit { session, payload }),
            Err(e) => tracing::warn!(error = %e, "failed to encode outbound message"),
        }

        self.store.append(message);
        actions
    }

    /// Point the manager at a new relay and reconnect immediately.
    ///
    /// Ignored if `url` is blank or equal to the current one. Cancels any
    /// pending reconnection.
    pub fn change_endpoint(&mut self, url: &str) -> Vec<ManagerAction> {
        let url = url.trim();
        if self.shut_down || url.is_empty() || url == self.endpoint.url {
            return Vec::new();
        }

        tracing::info!(from = %self.endpoint.url, to = %url, "endpoint changed");
        self.endpoint.url = url.to_owned();
        self.reconnect_at = None;
        self.connect()
    }

    /// Change and persist the display name. Does not reconnect.
    ///
    /// Blank names are ignored.
    pub fn set_display_name(&mut self, name: &str) -> Vec<ManagerAction> {
        let name = name.trim();
        if self.shut_down || name.is_empty() {
            return Vec::new();
        }

        self.endpoint.display_name = name.to_owned();
        config::store_display_name(self.store.storage(), name);
        Vec::new()
    }

    /// Empty the message log, in memory and in storage.
    pub fn clear(&mut self) {
        if self.shut_down {
            return;
        }
        self.store.clear();
    }

    /// Stop for good: cancel any pending reconnection and close the session.
    pub fn shutdown(&mut self) -> Vec<ManagerAction> {
        if self.shut_down {
            return Vec::new();
        }

        self.shut_down = true;
        self.reconnect_at = None;
        self.status = ConnectionStatus::Disconnected;

        tracing::info!("connection manager shut down");
        self.session
            .take()
            .map(|session| ManagerAction::CloseSession { session })
            .into_iter()
            .collect()
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Conversation log in insertion order.
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// Relay URL and display name.
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Reconnection delay state.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Session whose events are currently accepted. `None` if disconnected.
    pub fn current_session(&self) -> Option<SessionId> {
        self.session
    }

    /// Deadline of the pending reconnection. `None` if none is scheduled.
    pub fn reconnect_deadline(&self) -> Option<E::Instant> {
        self.reconnect_at
    }

    /// Time left until the pending reconnection. `None` if none is scheduled.
    pub fn reconnect_delay(&self) -> Option<Duration> {
        self.reconnect_at.map(|deadline| deadline - self.env.now())
    }

    /// Whether `shutdown()` has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Environment in use.
    pub fn env(&self) -> &E {
        &self.env
    }

    fn handle_opened(&mut self, session: SessionId) {
        if self.status == ConnectionStatus::Connected {
            tracing::debug!(%session, "duplicate open ignored");
            return;
        }

        self.status = ConnectionStatus::Connected;
        self.backoff.reset();

        tracing::info!(%session, url = %self.endpoint.url, "connected");
        let notice = format!("{} joined", self.endpoint.display_name);
        self.store.append(Message::system(notice, self.env.wall_clock_millis()));
    }

    fn handle_message(&mut self, raw: String) {
        let message = match decode_inbound(&raw) {
            Inbound::StructuredChat(message) => message,
            Inbound::PlainText(text) => Message::server_text(text, self.env.wall_clock_millis()),
        };
        self.store.append(message);
    }

    fn handle_failure(
        &mut self,
        session: SessionId,
        kind: &'static str,
        reason: &str,
    ) -> Vec<ManagerAction> {
        tracing::warn!(%session, %reason, "session {kind}");

        self.status = ConnectionStatus::Disconnected;
        self.session = None;
        self.schedule_reconnect();

        vec![ManagerAction::CloseSession { session }]
    }

    fn schedule_reconnect(&mut self) {
        if self.reconnect_at.is_some() {
            tracing::debug!("reconnect already pending");
            return;
        }

        let delay = self.backoff.advance();
        self.reconnect_at = Some(self.env.now() + delay);
        tracing::info!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
    }
}
