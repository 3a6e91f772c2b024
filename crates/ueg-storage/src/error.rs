//! Storage error types for ueg-storage.

use thiserror::Error;
use ueg_core::RegistryError;

/// Errors produced by registry backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying SQLite call failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A stored row could not be turned back into registry metadata.
    #[error("corrupt registry row for {hash}: {reason}")]
    Corrupt { hash: String, reason: String },
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        RegistryError {
            reason: err.to_string(),
        }
    }
}
