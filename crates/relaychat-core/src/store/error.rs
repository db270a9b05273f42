//! Storage errors.

use thiserror::Error;

/// Errors raised by [`Storage`](super::Storage) backends.
///
/// Callers inside the core never propagate these: persistence is best effort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Backend I/O failure (disk, database, lock poisoning).
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Failure injected by [`ChaoticStorage`](super::ChaoticStorage).
    #[error("injected failure during {operation}")]
    Injected {
        /// Operation that was failed.
        operation: &'static str,
    },
}
