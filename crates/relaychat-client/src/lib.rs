//! Relaychat client
//!
//! Production I/O around the Sans-IO [`relaychat_core::ConnectionManager`]:
//! a WebSocket transport, a durable redb-backed store, a real-time
//! environment, and the [`Runtime`] event loop that ties them to a
//! [`Frontend`].
//!
//! # Components
//!
//! - [`WsTransport`]: tokio-tungstenite sessions emitting [`SessionEvent`]s
//! - [`RedbStorage`]: file-backed [`relaychat_core::Storage`]
//! - [`SystemEnv`]: tokio time, system wall clock, OS randomness
//! - [`Runtime`]: single `select!` loop over events, commands and the
//!   reconnect timer
//!
//! [`SessionEvent`]: relaychat_core::SessionEvent

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
pub mod frontend;
pub mod runtime;
pub mod storage;
pub mod system_env;
pub mod transport;

pub use error::{RuntimeError, TransportError};
pub use frontend::{Command, Frontend, View};
pub use runtime::Runtime;
pub use storage::{RedbStorage, open_data_dir};
pub use system_env::SystemEnv;
pub use transport::{Session, Transport, WsSession, WsTransport};
