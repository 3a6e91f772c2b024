//! Hash registry backends for the graph core.
//!
//! The core defines the [`HashRegistry`](ueg_core::HashRegistry)
//! collaborator but holds no registry itself. This crate provides two:
//!
//! - [`InMemoryRegistry`]: a concurrent map, process-local
//! - [`SqliteRegistry`]: persistent, with embedded schema migrations

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use error::StorageError;
pub use memory::InMemoryRegistry;
pub use sqlite::SqliteRegistry;
