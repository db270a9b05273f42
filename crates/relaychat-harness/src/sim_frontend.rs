//! Channel-driven frontend.
//!
//! Tests push [`Command`]s through a [`FrontendHandle`] and read back every
//! view the runtime rendered. [`FrontendHandle::end_input`] makes the
//! runtime shut down.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use relaychat_client::{Command, Frontend, View};
use relaychat_core::{ConnectionStatus, Message};
use tokio::sync::mpsc;

/// Error type for the simulated frontend.
#[derive(Debug, Clone)]
pub struct SimFrontendError(pub String);

impl std::fmt::Display for SimFrontendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimFrontendError: {}", self.0)
    }
}

impl std::error::Error for SimFrontendError {}

/// Owned copy of one rendered [`View`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    /// Connection status.
    pub status: ConnectionStatus,
    /// Relay URL.
    pub url: String,
    /// Display name.
    pub display_name: String,
    /// Conversation log.
    pub messages: Vec<Message>,
}

#[derive(Debug)]
struct Shared {
    commands: Option<mpsc::UnboundedSender<Command>>,
    renders: Vec<RenderedView>,
    fail_renders: bool,
}

/// Frontend half handed to the runtime.
#[derive(Debug)]
pub struct SimFrontend {
    commands: mpsc::UnboundedReceiver<Command>,
    shared: Arc<Mutex<Shared>>,
}

/// Test half used to script commands and inspect renders.
#[derive(Debug, Clone)]
pub struct FrontendHandle {
    shared: Arc<Mutex<Shared>>,
}

impl SimFrontend {
    /// Create a connected frontend/handle pair.
    pub fn new() -> (Self, FrontendHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Mutex::new(Shared {
            commands: Some(tx),
            renders: Vec::new(),
            fail_renders: false,
        }));
        (Self { commands: rx, shared: Arc::clone(&shared) }, FrontendHandle { shared })
    }
}

impl Frontend for SimFrontend {
    type Error = SimFrontendError;

    async fn next_command(&mut self) -> Result<Option<Command>, SimFrontendError> {
        Ok(self.commands.recv().await)
    }

    fn render(&mut self, view: &View<'_>) -> Result<(), SimFrontendError> {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.fail_renders {
            return Err(SimFrontendError("render failed".to_owned()));
        }

        shared.renders.push(RenderedView {
            status: view.status,
            url: view.endpoint.url.clone(),
            display_name: view.endpoint.display_name.clone(),
            messages: view.messages.to_vec(),
        });
        Ok(())
    }
}

impl FrontendHandle {
    /// Queue a command. Returns `false` if the runtime has stopped or the
    /// input was ended.
    pub fn command(&self, command: Command) -> bool {
        self.lock().commands.as_ref().is_some_and(|tx| tx.send(command).is_ok())
    }

    /// End the input. The runtime sees `None` once queued commands drain.
    pub fn end_input(&self) {
        self.lock().commands = None;
    }

    /// Queue a chat message.
    pub fn send(&self, text: &str) -> bool {
        self.command(Command::Send(text.to_owned()))
    }

    /// Make every later render fail.
    pub fn fail_renders(&self) {
        self.lock().fail_renders = true;
    }

    /// Most recent render.
    pub fn last(&self) -> Option<RenderedView> {
        self.lock().renders.last().cloned()
    }

    /// Status of the most recent render.
    pub fn status(&self) -> Option<ConnectionStatus> {
        self.lock().renders.last().map(|view| view.status)
    }

    /// Number of renders so far.
    pub fn render_count(&self) -> usize {
        self.lock().renders.len()
    }

    /// Every status rendered, in order, with consecutive repeats collapsed.
    pub fn status_history(&self) -> Vec<ConnectionStatus> {
        let mut history: Vec<ConnectionStatus> =
            self.lock().renders.iter().map(|view| view.status).collect();
        history.dedup();
        history
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
