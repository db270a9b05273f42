//! Transport sessions.
//!
//! A [`Transport`] starts sessions; a [`Session`] is the handle to one live
//! connection. Sessions report what happens to them as [`SessionEvent`]s on
//! an mpsc channel tagged with the [`SessionId`] the manager assigned, so the
//! manager can tell a superseded session's late events apart from the
//! current one's.
//!
//! Sessions never retry. Reconnection is the manager's business.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures_util::{SinkExt, StreamExt};
use relaychat_core::{SessionEvent, SessionEventKind, SessionId};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Message as Frame, client::IntoClientRequest, handshake::client::Request},
};

use crate::TransportError;

/// Starts transport sessions.
pub trait Transport: Send {
    /// Handle type for one session.
    type Session: Session;

    /// Start connecting to `url` and return immediately.
    ///
    /// Every event the session produces is tagged with `session` and sent on
    /// `events`.
    ///
    /// # Errors
    ///
    /// - `TransportError::InvalidUrl` if `url` cannot be used at all
    /// - `TransportError::Connection` if the session cannot be started
    fn open(
        &mut self,
        url: &str,
        session: SessionId,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self::Session, TransportError>;
}

/// Handle to one transport session.
pub trait Session: Send {
    /// Id the session tags its events with.
    fn id(&self) -> SessionId;

    /// Queue a text frame. Returns `false` if the session is not open.
    fn send(&self, text: &str) -> bool;

    /// Tear the session down. Idempotent. No events are emitted afterwards.
    fn close(&mut self);
}

/// WebSocket transport over tokio-tungstenite.
///
/// Supports `ws://` and `wss://` URLs. Each session runs in its own tokio
/// task, so [`Transport::open`] must be called from within a runtime.
#[derive(Debug, Clone, Copy)]
pub struct WsTransport;

impl WsTransport {
    /// Create a WebSocket transport.
    ///
    /// Installs the ring crypto provider for `wss://` unless the process
    /// already has one.
    #[must_use]
    pub fn new() -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();
        Self
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WsTransport {
    type Session = WsSession;

    fn open(
        &mut self,
        url: &str,
        session: SessionId,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<WsSession, TransportError> {
        let request = url.into_client_request().map_err(|e| TransportError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        let sink = EventSink::new(session, events);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_session(request, sink.clone(), outbound_rx));

        Ok(WsSession { id: session, sink, outbound: Some(outbound_tx), task })
    }
}

/// Handle to a live WebSocket session.
#[derive(Debug)]
pub struct WsSession {
    id: SessionId,
    sink: EventSink,
    outbound: Option<mpsc::UnboundedSender<String>>,
    task: JoinHandle<()>,
}

impl Session for WsSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn send(&self, text: &str) -> bool {
        if !self.sink.is_open() {
            return false;
        }

        match &self.outbound {
            Some(outbound) => outbound.send(text.to_owned()).is_ok(),
            None => false,
        }
    }

    fn close(&mut self) {
        let handshake_done = self.sink.is_connected();
        if self.sink.detach() {
            return;
        }

        tracing::debug!(session = %self.id, handshake_done, "closing session");

        // Dropping the sender makes an open session send a close frame and exit.
        self.outbound = None;
        if !handshake_done {
            self.task.abort();
        }
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Event channel shared between a session handle and its task.
#[derive(Debug, Clone)]
struct EventSink {
    session: SessionId,
    events: mpsc::UnboundedSender<SessionEvent>,
    open: Arc<AtomicBool>,
    detached: Arc<AtomicBool>,
}

impl EventSink {
    fn new(session: SessionId, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            session,
            events,
            open: Arc::new(AtomicBool::new(false)),
            detached: Arc::new(AtomicBool::new(false)),
        }
    }

    fn is_open(&self) -> bool {
        self.is_connected() && !self.detached.load(Ordering::Acquire)
    }

    /// Whether the handshake completed and the task still owns the stream.
    fn is_connected(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }

    /// Stop delivering events. Returns whether it was already detached.
    fn detach(&self) -> bool {
        self.detached.swap(true, Ordering::AcqRel)
    }

    fn emit(&self, kind: SessionEventKind) {
        if self.detached.load(Ordering::Acquire) {
            return;
        }
        // Receiver gone means the runtime is shutting down.
        let _ = self.events.send(SessionEvent::new(self.session, kind));
    }
}

async fn run_session(
    request: Request,
    sink: EventSink,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let stream = match connect_async(request).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::debug!(session = %sink.session, error = %e, "handshake failed");
            sink.emit(SessionEventKind::Errored(e.to_string()));
            return;
        },
    };

    sink.set_open(true);
    sink.emit(SessionEventKind::Opened);

    let (mut writer, mut reader) = stream.split();

    loop {
        tokio::select! {
            frame = reader.next() => match frame {
                Some(Ok(Frame::Text(text))) => {
                    sink.emit(SessionEventKind::MessageReceived(text));
                },
                Some(Ok(Frame::Binary(data))) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    sink.emit(SessionEventKind::MessageReceived(text));
                },
                Some(Ok(Frame::Close(frame))) => {
                    let reason = frame.map_or_else(
                        || "closed by peer".to_owned(),
                        |f| format!("{} {}", u16::from(f.code), f.reason),
                    );
                    sink.emit(SessionEventKind::Closed(reason));
                    break;
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    sink.emit(SessionEventKind::Errored(e.to_string()));
                    break;
                },
                None => {
                    sink.emit(SessionEventKind::Closed("stream ended".to_owned()));
                    break;
                },
            },
            text = outbound.recv() => match text {
                Some(text) => {
                    if let Err(e) = writer.send(Frame::Text(text)).await {
                        sink.emit(SessionEventKind::Errored(e.to_string()));
                        break;
                    }
                },
                None => {
                    if let Err(e) = writer.close().await {
                        tracing::debug!(session = %sink.session, error = %e, "close frame not sent");
                    }
                    break;
                },
            },
        }
    }

    sink.set_open(false);
    tracing::debug!(session = %sink.session, "session task finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_url_fails_synchronously() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = WsTransport::new().open("not a url", SessionId(1), tx);

        assert!(matches!(result, Err(TransportError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn unreachable_relay_reports_error_event() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = WsTransport::new().open(&format!("ws://{addr}"), SessionId(3), tx).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.session, SessionId(3));
        assert!(matches!(event.kind, SessionEventKind::Errored(_)));
        assert!(!session.send("hello"));
    }

    async fn local_relay() -> (tokio::net::TcpListener, String) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn close_after_handshake_sends_close_frame() {
        let (listener, url) = local_relay().await;
        let relay = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.next().await
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = WsTransport::new().open(&url, SessionId(1), tx).unwrap();
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::opened(SessionId(1)));

        session.close();

        let received = relay.await.unwrap();
        assert!(matches!(received, Some(Ok(Frame::Close(_)))), "relay saw {received:?}");
    }

    #[tokio::test]
    async fn binary_frames_arrive_as_lossy_text() {
        let (listener, url) = local_relay().await;
        let relay = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Frame::Binary(vec![b'h', b'i', 0xff])).await.unwrap();
            ws.next().await
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = WsTransport::new().open(&url, SessionId(2), tx).unwrap();

        assert_eq!(rx.recv().await.unwrap(), SessionEvent::opened(SessionId(2)));
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::message(SessionId(2), "hi\u{FFFD}"));

        session.close();
        relay.await.unwrap();
    }

    #[tokio::test]
    async fn close_is_idempotent_and_silences_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = WsTransport::new().open("ws://127.0.0.1:9", SessionId(1), tx).unwrap();

        session.close();
        session.close();
        drop(session);

        assert!(rx.recv().await.is_none());
    }
}
