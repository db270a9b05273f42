//! Generic runtime for connection orchestration.
//!
//! The Runtime drives the client event loop, coordinating between:
//! - [`ConnectionManager`]: connection state machine
//! - [`Transport`]: session I/O
//! - [`Frontend`]: user commands and rendering
//!
//! One `select!` loop multiplexes transport events, frontend commands and the
//! single reconnect timer. Each branch runs to completion before the next is
//! polled, so the manager is never shared.

use std::collections::VecDeque;

use relaychat_core::{ConnectionManager, Environment, ManagerAction, SessionEvent, Storage};
use tokio::sync::mpsc;

use crate::{Command, Frontend, Session, Transport, View};

/// Event loop tying a [`ConnectionManager`] to real I/O.
///
/// # Type Parameters
///
/// - `E`: Environment (time and randomness)
/// - `S`: Storage backend of the message log
/// - `T`: Transport that opens sessions
/// - `F`: Frontend supplying commands and rendering views
pub struct Runtime<E, S, T, F>
where
    E: Environment,
    S: Storage,
    T: Transport,
    F: Frontend,
{
    manager: ConnectionManager<E, S>,
    transport: T,
    frontend: F,
    session: Option<T::Session>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl<E, S, T, F> Runtime<E, S, T, F>
where
    E: Environment,
    S: Storage,
    T: Transport,
    F: Frontend,
{
    /// Create a runtime around a disconnected manager.
    pub fn new(manager: ConnectionManager<E, S>, transport: T, frontend: F) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self { manager, transport, frontend, session: None, events_tx, events_rx }
    }

    /// Run until the frontend quits or its input ends.
    ///
    /// Connects on start and shuts the manager down on exit, closing the live
    /// session and cancelling any pending reconnect.
    ///
    /// # Errors
    ///
    /// Returns the frontend's error if reading commands or rendering fails.
    /// The manager is shut down in that case too.
    pub async fn run(mut self) -> Result<(), F::Error> {
        let actions = self.manager.connect();
        self.execute(actions);

        let result = self.event_loop().await;

        let actions = self.manager.shutdown();
        self.execute(actions);

        result?;
        self.render()
    }

    async fn event_loop(&mut self) -> Result<(), F::Error> {
        self.render()?;

        loop {
            let reconnect_in = self.manager.reconnect_delay();

            tokio::select! {
                biased;

                Some(event) = self.events_rx.recv() => {
                    let actions = self.manager.handle_session_event(event);
                    self.execute(actions);
                },

                command = self.frontend.next_command() => match command? {
                    None | Some(Command::Quit) => {
                        tracing::info!("frontend finished");
                        return Ok(());
                    },
                    Some(command) => self.apply(command),
                },

                () = self.manager.env().sleep(reconnect_in.unwrap_or_default()),
                    if reconnect_in.is_some() =>
                {
                    let actions = self.manager.tick();
                    self.execute(actions);
                },
            }

            self.render()?;
        }
    }

    fn apply(&mut self, command: Command) {
        tracing::debug!(?command, "applying command");

        let actions = match command {
            Command::Send(text) => self.manager.send(&text),
            Command::Clear => {
                self.manager.clear();
                Vec::new()
            },
            Command::ChangeEndpoint(url) => self.manager.change_endpoint(&url),
            Command::SetDisplayName(name) => self.manager.set_display_name(&name),
            Command::Quit => Vec::new(),
        };

        self.execute(actions);
    }

    /// Execute manager actions in order.
    ///
    /// A session that fails to start is reported back to the manager as an
    /// `Errored` event; the resulting actions run in the same pass.
    fn execute(&mut self, actions: Vec<ManagerAction>) {
        let mut pending: VecDeque<ManagerAction> = actions.into();

        while let Some(action) = pending.pop_front() {
            match action {
                ManagerAction::OpenSession { session, url } => {
                    match self.transport.open(&url, session, self.events_tx.clone()) {
                        Ok(handle) => {
                            if let Some(mut stale) = self.session.replace(handle) {
                                stale.close();
                            }
                        },
                        Err(e) => {
                            tracing::warn!(%session, error = %e, "failed to open session");
                            let event = SessionEvent::errored(session, e.to_string());
                            pending.extend(self.manager.handle_session_event(event));
                        },
                    }
                },
                ManagerAction::CloseSession { session } => {
                    if let Some(mut handle) = self.session.take_if(|h| h.id() == session) {
                        handle.close();
                    }
                },
                ManagerAction::Transmit { session, payload } => match &self.session {
                    Some(handle) if handle.id() == session => {
                        if !handle.send(&payload) {
                            tracing::debug!(%session, "session not open, payload dropped");
                        }
                    },
                    _ => tracing::debug!(%session, "no live session, payload dropped"),
                },
            }
        }
    }

    fn render(&mut self) -> Result<(), F::Error> {
        let view = View {
            status: self.manager.status(),
            endpoint: self.manager.endpoint(),
            messages: self.manager.messages(),
        };
        self.frontend.render(&view)
    }

    /// Connection manager.
    pub fn manager(&self) -> &ConnectionManager<E, S> {
        &self.manager
    }
}
