//! Presentation seam.
//!
//! The [`Frontend`] trait decouples the runtime from how the conversation is
//! shown and how user intent is collected. The terminal binary implements it
//! over stdin/stdout; tests implement it over channels.

use std::future::Future;

use relaychat_core::{ConnectionStatus, EndpointConfig, Message};

/// User intent collected by a frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a chat message.
    Send(String),
    /// Empty the conversation log.
    Clear,
    /// Reconnect to a different relay.
    ChangeEndpoint(String),
    /// Change the display name.
    SetDisplayName(String),
    /// Stop the client.
    Quit,
}

/// Read-only view of the manager handed to [`Frontend::render`].
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    /// Connection status.
    pub status: ConnectionStatus,
    /// Relay URL and display name.
    pub endpoint: &'a EndpointConfig,
    /// Conversation log in insertion order.
    pub messages: &'a [Message],
}

/// Collects commands and renders views.
pub trait Frontend: Send {
    /// Frontend I/O error.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next command. `None` means input is exhausted.
    ///
    /// Must be cancel-safe: the runtime polls it inside `select!`.
    fn next_command(&mut self) -> impl Future<Output = Result<Option<Command>, Self::Error>> + Send;

    /// Show the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    fn render(&mut self, view: &View<'_>) -> Result<(), Self::Error>;
}
