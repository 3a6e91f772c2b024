//! Provenance records: a Merkle root over a fragment's creation history.
//!
//! Each transformation step a front-end applies is recorded as one leaf,
//! `blake3(step)`. Parents are `blake3(left || right)`; an unpaired node at
//! the end of a level is promoted unchanged. An empty history hashes to
//! `blake3("")`.
//!
//! The fragment itself only carries the 32-byte root as an opaque blob.

use serde::{Deserialize, Serialize};

/// Byte length of a well-formed provenance root.
pub const PROVENANCE_ROOT_LEN: usize = 32;

/// Computes the Merkle root over already-hashed leaves.
pub fn merkle_root(leaves: &[blake3::Hash]) -> blake3::Hash {
    if leaves.is_empty() {
        return blake3::hash(b"");
    }
    let mut level: Vec<blake3::Hash> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => {
                    let mut hasher = blake3::Hasher::new();
                    hasher.update(left.as_bytes());
                    hasher.update(right.as_bytes());
                    hasher.finalize()
                }
                _ => pair[0],
            })
            .collect();
    }
    level[0]
}

/// Append-only log of transformation steps.
#[derive(Debug, Clone, Default)]
pub struct ProvenanceLog {
    leaves: Vec<blake3::Hash>,
}

impl ProvenanceLog {
    pub fn new() -> Self {
        ProvenanceLog::default()
    }

    /// Records one transformation step by its content.
    pub fn record(&mut self, step: &[u8]) {
        self.leaves.push(blake3::hash(step));
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn root(&self) -> blake3::Hash {
        merkle_root(&self.leaves)
    }

    /// Seals the log into the provenance blob a fragment carries.
    pub fn seal(&self) -> Provenance {
        Provenance::from_root(self.root())
    }
}

/// Opaque provenance blob attached to a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Provenance(pub Vec<u8>);

impl Provenance {
    pub fn from_root(root: blake3::Hash) -> Self {
        Provenance(root.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Basic shape check: exactly one 256-bit root.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == PROVENANCE_ROOT_LEN
    }
}
