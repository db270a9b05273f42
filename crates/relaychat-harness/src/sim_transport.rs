//! Scripted in-memory transport.
//!
//! `SimTransport` implements [`Transport`] so the production
//! [`relaychat_client::Runtime`] runs unchanged in tests. Sessions never open
//! on their own (unless auto-open is enabled): the test decides when a
//! session opens, what it receives and how it dies. Every open, send and
//! close is recorded for assertions.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use relaychat_client::{Session, Transport, TransportError};
use relaychat_core::{SessionEvent, SessionEventKind, SessionId};
use tokio::sync::mpsc;

/// One session as seen from the relay side.
#[derive(Debug)]
struct Link {
    events: mpsc::UnboundedSender<SessionEvent>,
    open: bool,
    closed: bool,
}

#[derive(Debug, Default)]
struct SimState {
    links: HashMap<SessionId, Link>,
    opened: Vec<(SessionId, String)>,
    sent: Vec<(SessionId, String)>,
    closed: Vec<SessionId>,
    failing_opens: usize,
    auto_open: bool,
}

/// Scripted transport. Clones share state, so keep one for scripting and
/// hand another to the runtime.
#[derive(Debug, Clone, Default)]
pub struct SimTransport {
    state: Arc<Mutex<SimState>>,
}

impl SimTransport {
    /// Create a transport whose sessions wait to be accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport whose sessions open as soon as they are started.
    pub fn auto_open() -> Self {
        let transport = Self::new();
        transport.lock().auto_open = true;
        transport
    }

    /// Make the next `count` opens fail synchronously.
    pub fn fail_next_opens(&self, count: usize) {
        self.lock().failing_opens = count;
    }

    /// Report the session as open.
    pub fn accept(&self, session: SessionId) -> bool {
        self.emit(session, SessionEventKind::Opened)
    }

    /// Deliver an inbound frame.
    pub fn deliver(&self, session: SessionId, raw: &str) -> bool {
        self.emit(session, SessionEventKind::MessageReceived(raw.to_owned()))
    }

    /// Report an abrupt close.
    pub fn drop_connection(&self, session: SessionId, reason: &str) -> bool {
        self.emit(session, SessionEventKind::Closed(reason.to_owned()))
    }

    /// Report a transport error.
    pub fn fail(&self, session: SessionId, reason: &str) -> bool {
        self.emit(session, SessionEventKind::Errored(reason.to_owned()))
    }

    /// Emit an event for `session`.
    ///
    /// Returns `false` if the session is unknown or was closed by the client,
    /// in which case nothing is emitted.
    pub fn emit(&self, session: SessionId, kind: SessionEventKind) -> bool {
        let mut state = self.lock();
        let Some(link) = state.links.get_mut(&session) else {
            return false;
        };
        if link.closed {
            return false;
        }

        match kind {
            SessionEventKind::Opened => link.open = true,
            SessionEventKind::Closed(_) | SessionEventKind::Errored(_) => link.open = false,
            SessionEventKind::MessageReceived(_) => {},
        }

        link.events.send(SessionEvent::new(session, kind)).is_ok()
    }

    /// Most recently started session.
    pub fn latest(&self) -> Option<SessionId> {
        self.lock().opened.last().map(|(session, _)| *session)
    }

    /// Every successful open as `(session, url)`, in order.
    pub fn opened(&self) -> Vec<(SessionId, String)> {
        self.lock().opened.clone()
    }

    /// Number of sessions started.
    pub fn open_count(&self) -> usize {
        self.lock().opened.len()
    }

    /// Every payload accepted by a session, in order.
    pub fn sent(&self) -> Vec<(SessionId, String)> {
        self.lock().sent.clone()
    }

    /// Sessions closed by the client, in order. Each appears once.
    pub fn closed(&self) -> Vec<SessionId> {
        self.lock().closed.clone()
    }

    /// Whether the client still holds `session` open.
    pub fn is_live(&self, session: SessionId) -> bool {
        self.lock().links.get(&session).is_some_and(|link| link.open && !link.closed)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for SimTransport {
    type Session = SimSession;

    fn open(
        &mut self,
        url: &str,
        session: SessionId,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<SimSession, TransportError> {
        let mut state = self.lock();

        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            tracing::debug!(%session, %url, "simulated open failure");
            return Err(TransportError::Connection("simulated refusal".to_owned()));
        }

        state.opened.push((session, url.to_owned()));
        state.links.insert(session, Link { events, open: false, closed: false });

        let auto_open = state.auto_open;
        drop(state);

        if auto_open {
            self.accept(session);
        }

        Ok(SimSession { id: session, state: Arc::clone(&self.state) })
    }
}

/// Client-side handle to a simulated session.
#[derive(Debug)]
pub struct SimSession {
    id: SessionId,
    state: Arc<Mutex<SimState>>,
}

impl Session for SimSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn send(&self, text: &str) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let live = state.links.get(&self.id).is_some_and(|link| link.open && !link.closed);
        if live {
            state.sent.push((self.id, text.to_owned()));
        }
        live
    }

    fn close(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(link) = state.links.get_mut(&self.id) else {
            return;
        };
        if link.closed {
            return;
        }

        link.closed = true;
        link.open = false;
        state.closed.push(self.id);
    }
}
