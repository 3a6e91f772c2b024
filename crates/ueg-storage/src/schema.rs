//! Database handles for the persistent semantic-hash registry.
//!
//! The registry is one append-only table keyed by hex hash. Its version
//! lives in `user_version`, so reopening an existing registry file applies
//! only the migrations it has not seen.

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use crate::error::StorageError;

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!("migrations/001_registry.sql"))])
}

/// Opens the registry file at `path`, creating an empty registry when the
/// file does not exist. Hashes registered by earlier runs stay visible.
pub fn open_database(path: &str) -> Result<Connection, StorageError> {
    let mut conn = Connection::open(path)?;
    configure_and_migrate(&mut conn)?;
    Ok(conn)
}

/// A registry that lives for one process, for tests and one-shot CLI runs.
pub fn open_in_memory() -> Result<Connection, StorageError> {
    let mut conn = Connection::open_in_memory()?;
    configure_and_migrate(&mut conn)?;
    Ok(conn)
}

fn configure_and_migrate(conn: &mut Connection) -> Result<(), StorageError> {
    // Pipelines in other processes keep looking up hashes while one registers.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    migrations()
        .to_latest(conn)
        .map_err(|e| StorageError::Migration(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }

    #[test]
    fn in_memory_database_has_registry_table() {
        let conn = open_in_memory().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM semantic_hashes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn reopening_keeps_registered_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");
        let path = path.to_str().unwrap();

        let conn = open_database(path).unwrap();
        conn.execute(
            "INSERT INTO semantic_hashes (hash, origin, provenance) VALUES ('ab', 'cli', '')",
            [],
        )
        .unwrap();
        drop(conn);

        let conn = open_database(path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM semantic_hashes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
