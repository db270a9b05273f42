//! Redb-backed durable storage implementation.
//!
//! One table of string keys to string values, mirroring the browser-style
//! local storage the message log and display name are written to. Every
//! write is its own ACID transaction, so a crash never leaves a torn log.

use std::{fmt, path::Path, sync::Arc};

use ::redb::{Database, ReadableTable, TableDefinition};
use relaychat_core::{Storage, StorageError};

/// Table: local_storage
/// Key: storage key (e.g. `relaychat.messages`)
/// Value: stored string (JSON for the log, plain text for the display name)
const LOCAL_STORAGE: TableDefinition<&str, &str> = TableDefinition::new("local_storage");

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl fmt::Debug for RedbStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbStorage").finish_non_exhaustive()
    }
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(LOCAL_STORAGE).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        tracing::debug!(path = %path.as_ref().display(), "opened local storage");
        Ok(Self { db: Arc::new(db) })
    }
}

impl Storage for RedbStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(LOCAL_STORAGE).map_err(io)?;

        let value = table.get(key).map_err(io)?;
        Ok(value.map(|guard| guard.value().to_owned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(LOCAL_STORAGE).map_err(io)?;
            table.insert(key, value).map_err(io)?;
        }
        txn.commit().map_err(io)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(LOCAL_STORAGE).map_err(io)?;
            table.remove(key).map_err(io)?;
        }
        txn.commit().map_err(io)
    }
}

fn io(e: impl ToString) -> StorageError {
    StorageError::Io(e.to_string())
}
