//! Transport session identity and lifecycle events.
//!
//! Every session the manager opens gets a fresh [`SessionId`]. Transports tag
//! each event with the id of the session that produced it, which lets the
//! manager drop late events from a session it has already torn down.

use std::fmt;

/// Identifier of one transport session. Never reused within a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle or data event emitted by a transport session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventKind {
    /// Connection established.
    Opened,
    /// Text payload received (binary payloads arrive as lossy UTF-8).
    MessageReceived(String),
    /// Connection closed by either side.
    Closed(String),
    /// Connection failed.
    Errored(String),
}

/// Event tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// Producing session.
    pub session: SessionId,
    /// What happened.
    pub kind: SessionEventKind,
}

impl SessionEvent {
    /// Create an event for `session`.
    pub fn new(session: SessionId, kind: SessionEventKind) -> Self {
        Self { session, kind }
    }

    /// Shorthand for [`SessionEventKind::Opened`].
    pub fn opened(session: SessionId) -> Self {
        Self::new(session, SessionEventKind::Opened)
    }

    /// Shorthand for [`SessionEventKind::MessageReceived`].
    pub fn message(session: SessionId, raw: impl Into<String>) -> Self {
        Self::new(session, SessionEventKind::MessageReceived(raw.into()))
    }

    /// Shorthand for [`SessionEventKind::Closed`].
    pub fn closed(session: SessionId, reason: impl Into<String>) -> Self {
        Self::new(session, SessionEventKind::Closed(reason.into()))
    }

    /// Shorthand for [`SessionEventKind::Errored`].
    pub fn errored(session: SessionId, reason: impl Into<String>) -> Self {
        Self::new(session, SessionEventKind::Errored(reason.into()))
    }
}
