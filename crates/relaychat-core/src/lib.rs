//! Relaychat core
//!
//! Sans-IO connection lifecycle for a single-relay chat client. Establishes,
//! monitors and recovers one long-lived session, and records the resulting
//! conversation in a durably mirrored log.
//!
//! # Architecture
//!
//! The [`ConnectionManager`] receives inputs (explicit calls, [`SessionEvent`]s
//! from the transport, timer ticks) and returns [`ManagerAction`]s for the
//! caller to execute. It never touches a socket or a clock directly: time and
//! randomness come from an [`Environment`], so the same state machine runs
//! under real time in production and virtual time in simulation.
//!
//! # Components
//!
//! - [`Backoff`]: Exponential reconnection delay with a ceiling
//! - [`ConnectionManager`]: Connection state machine
//! - [`MessageStore`]: Append-only log persisted through a [`Storage`] backend
//! - [`decode_inbound`]: Relay payload decoding with plain-text fallback

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backoff;
pub mod config;
pub mod env;
mod error;
pub mod manager;
pub mod message;
pub mod session;
pub mod store;

pub use backoff::{Backoff, BackoffConfig};
pub use config::EndpointConfig;
pub use env::Environment;
pub use error::ConfigError;
pub use manager::{ConnectionManager, ConnectionStatus, ManagerAction};
pub use message::{Direction, Inbound, Message, MessageKind, decode_inbound, encode_chat};
pub use session::{SessionEvent, SessionEventKind, SessionId};
pub use store::{ChaoticStorage, MemoryStorage, MessageStore, Storage, StorageError};
