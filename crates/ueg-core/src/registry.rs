//! The optional global hash registry collaborator.
//!
//! The core holds no registry of its own. When a caller wires one in, the
//! validator looks up each fragment's semantic hash; pipelines may register
//! accepted hashes afterwards. Implementations live in `ueg-storage`.

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::id::SemanticHash;

/// What a registry remembers about a hash it has seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMetadata {
    /// Who first registered the hash (front-end name, source path, ...).
    pub origin: String,
    /// Hex provenance root of the registering fragment.
    pub provenance: String,
}

impl RegistryMetadata {
    pub fn new(origin: impl Into<String>, provenance: impl Into<String>) -> Self {
        RegistryMetadata {
            origin: origin.into(),
            provenance: provenance.into(),
        }
    }
}

/// Result of a registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Lookup {
    Unseen,
    Seen(RegistryMetadata),
}

/// A shared store of semantic hashes.
///
/// Registries are the only shared mutable state in the system, so
/// implementations synchronise internally and take `&self`.
pub trait HashRegistry: Send + Sync {
    fn lookup(&self, hash: &SemanticHash) -> Result<Lookup, RegistryError>;

    /// Records `hash`. Re-registering a known hash keeps the first metadata.
    fn register(&self, hash: &SemanticHash, metadata: RegistryMetadata) -> Result<(), RegistryError>;
}
