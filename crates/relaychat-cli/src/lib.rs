//! Relaychat terminal client.
//!
//! Command-line arguments and a line-oriented [`Frontend`] over
//! stdin/stdout. The binary wires them to the WebSocket runtime.
//!
//! [`Frontend`]: relaychat_client::Frontend

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod args;
pub mod terminal;

pub use args::Args;
pub use terminal::{InputError, TerminalFrontend, parse_line};
