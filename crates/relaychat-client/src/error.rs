//! Client error types.

use relaychat_core::StorageError;
use thiserror::Error;

/// Synchronous failure to start a transport session.
///
/// Asynchronous failures never surface here: they arrive as
/// `SessionEventKind::Errored` events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// URL could not be turned into a WebSocket handshake request.
    #[error("invalid relay url {url}: {reason}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// Session could not be started.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Errors that end the process. They all happen outside the connection
/// manager.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Durable storage could not be opened.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Frontend input or output failed.
    #[error("frontend I/O error: {0}")]
    Io(#[from] std::io::Error),
}
