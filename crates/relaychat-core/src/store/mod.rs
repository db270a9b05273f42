//! Message log and its storage abstraction.
//!
//! [`MessageStore`] keeps the conversation in memory and mirrors every change
//! to a [`Storage`] backend under a fixed key. The backend is a small
//! synchronous key-value interface so the same log logic runs over an
//! in-memory map in tests and a durable database in production.
//!
//! Persistence is best effort: failures are logged and swallowed, and the
//! in-memory log stays authoritative for the running session.

mod chaotic;
mod error;
mod memory;

pub use chaotic::ChaoticStorage;
pub use error::StorageError;
pub use memory::MemoryStorage;

use crate::Message;

/// Key holding the serialized message log (JSON array).
pub const MESSAGES_KEY: &str = "relaychat.messages";

/// Key holding the plain display-name string.
pub const DISPLAY_NAME_KEY: &str = "relaychat.display_name";

/// Key-value storage for local client state.
///
/// Must be Clone (the log and the display-name settings share one backend),
/// Send + Sync, and synchronous. Implementations typically share internal
/// state via Arc, so clones access the same underlying storage.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Value stored under `key`. `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Append-only conversation log, durably mirrored to storage.
#[derive(Debug, Clone)]
pub struct MessageStore<S: Storage> {
    storage: S,
    messages: Vec<Message>,
}

impl<S: Storage> MessageStore<S> {
    /// Rehydrate the log persisted in `storage`.
    ///
    /// Falls back to an empty log if the key is absent, the backend fails, or
    /// the stored value is not a valid JSON array of messages.
    pub fn load(storage: S) -> Self {
        let messages = match storage.get(MESSAGES_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Message>>(&raw) {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable message log");
                    Vec::new()
                },
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read message log");
                Vec::new()
            },
        };

        tracing::debug!(count = messages.len(), "message log loaded");
        Self { storage, messages }
    }

    /// Append `message` and persist the whole log.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.persist();
    }

    /// Drop every message and the persisted entry.
    pub fn clear(&mut self) {
        self.messages.clear();
        if let Err(e) = self.storage.remove(MESSAGES_KEY) {
            tracing::warn!(error = %e, "failed to remove persisted message log");
        }
    }

    /// Messages in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the log.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Backend the log is mirrored to.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn persist(&self) {
        let serialized = match serde_json::to_string(&self.messages) {
            Ok(serialized) => serialized,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize message log");
                return;
            },
        };

        if let Err(e) = self.storage.set(MESSAGES_KEY, &serialized) {
            tracing::warn!(error = %e, count = self.messages.len(), "failed to persist message log");
        }
    }
}
