//! SQLite implementation of [`HashRegistry`].
//!
//! [`SqliteRegistry`] persists semantic hashes across processes. The
//! connection sits behind a mutex because the registry trait takes `&self`.
//! Hashes are stored as lowercase hex TEXT.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use ueg_core::{HashRegistry, Lookup, RegistryError, RegistryMetadata, SemanticHash};

use crate::error::StorageError;

/// SQLite-backed hash registry.
pub struct SqliteRegistry {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRegistry").finish_non_exhaustive()
    }
}

impl SqliteRegistry {
    /// Opens (or creates) a registry database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteRegistry {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory registry (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteRegistry {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of registered hashes.
    pub fn count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM semantic_hashes", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|e| StorageError::Corrupt {
            hash: "*".into(),
            reason: e.to_string(),
        })
    }

    /// Metadata for `hash`, if registered.
    pub fn get(&self, hash: &SemanticHash) -> Result<Option<RegistryMetadata>, StorageError> {
        let row = self
            .conn()
            .query_row(
                "SELECT origin, provenance FROM semantic_hashes WHERE hash = ?1",
                params![hash.to_hex()],
                |row| Ok(RegistryMetadata::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    /// Inserts `hash` unless present. Returns whether a row was written.
    pub fn insert(&self, hash: &SemanticHash, metadata: &RegistryMetadata) -> Result<bool, StorageError> {
        let written = self.conn().execute(
            "INSERT OR IGNORE INTO semantic_hashes (hash, origin, provenance) VALUES (?1, ?2, ?3)",
            params![hash.to_hex(), metadata.origin, metadata.provenance],
        )?;
        Ok(written == 1)
    }
}

impl HashRegistry for SqliteRegistry {
    fn lookup(&self, hash: &SemanticHash) -> Result<Lookup, RegistryError> {
        Ok(match self.get(hash)? {
            Some(metadata) => Lookup::Seen(metadata),
            None => Lookup::Unseen,
        })
    }

    fn register(&self, hash: &SemanticHash, metadata: RegistryMetadata) -> Result<(), RegistryError> {
        if self.insert(hash, &metadata)? {
            debug!(%hash, origin = %metadata.origin, "registered semantic hash");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup() {
        let registry = SqliteRegistry::in_memory().unwrap();
        let hash = SemanticHash([0xab; 32]);
        assert_eq!(registry.lookup(&hash).unwrap(), Lookup::Unseen);

        registry.register(&hash, RegistryMetadata::new("zig-frontend", "ff00")).unwrap();
        assert_eq!(
            registry.lookup(&hash).unwrap(),
            Lookup::Seen(RegistryMetadata::new("zig-frontend", "ff00"))
        );
    }

    #[test]
    fn insert_reports_whether_row_was_new() {
        let registry = SqliteRegistry::in_memory().unwrap();
        let hash = SemanticHash([1; 32]);
        assert!(registry.insert(&hash, &RegistryMetadata::new("a", "01")).unwrap());
        assert!(!registry.insert(&hash, &RegistryMetadata::new("b", "02")).unwrap());
        assert_eq!(registry.count().unwrap(), 1);
        assert_eq!(registry.get(&hash).unwrap().unwrap().origin, "a");
    }
}
