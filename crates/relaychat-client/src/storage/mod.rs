//! Durable storage backends.
//!
//! The in-memory and fault-injecting backends live in `relaychat-core`; this
//! module adds the file-backed one used by the binary.

mod redb;

use std::path::Path;

pub use self::redb::RedbStorage;
use crate::RuntimeError;

/// Create `data_dir` if needed and open the database `file_name` inside it.
///
/// # Errors
///
/// - `RuntimeError::Io` if the directory cannot be created
/// - `RuntimeError::Storage` if the database cannot be opened
pub fn open_data_dir(
    data_dir: impl AsRef<Path>,
    file_name: &str,
) -> Result<RedbStorage, RuntimeError> {
    let data_dir = data_dir.as_ref();
    std::fs::create_dir_all(data_dir)?;

    let path = data_dir.join(file_name);
    tracing::info!(path = %path.display(), "opening message log");
    Ok(RedbStorage::open(path)?)
}
