//! In-memory [`HashRegistry`] backed by a concurrent map.
//!
//! Suitable for a single process that runs several pipelines in parallel.
//! Nothing is persisted.

use dashmap::DashMap;
use tracing::debug;

use ueg_core::{HashRegistry, Lookup, RegistryError, RegistryMetadata, SemanticHash};

/// Process-local hash registry.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    hashes: DashMap<SemanticHash, RegistryMetadata>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        InMemoryRegistry::default()
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl HashRegistry for InMemoryRegistry {
    fn lookup(&self, hash: &SemanticHash) -> Result<Lookup, RegistryError> {
        Ok(match self.hashes.get(hash) {
            Some(entry) => Lookup::Seen(entry.value().clone()),
            None => Lookup::Unseen,
        })
    }

    fn register(&self, hash: &SemanticHash, metadata: RegistryMetadata) -> Result<(), RegistryError> {
        self.hashes.entry(*hash).or_insert_with(|| {
            debug!(%hash, origin = %metadata.origin, "registered semantic hash");
            metadata
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn hash(byte: u8) -> SemanticHash {
        SemanticHash([byte; 32])
    }

    #[test]
    fn unseen_until_registered() {
        let registry = InMemoryRegistry::new();
        assert_eq!(registry.lookup(&hash(1)).unwrap(), Lookup::Unseen);

        registry.register(&hash(1), RegistryMetadata::new("rust-frontend", "ab")).unwrap();
        assert_eq!(
            registry.lookup(&hash(1)).unwrap(),
            Lookup::Seen(RegistryMetadata::new("rust-frontend", "ab"))
        );
        assert_eq!(registry.lookup(&hash(2)).unwrap(), Lookup::Unseen);
    }

    #[test]
    fn first_registration_wins() {
        let registry = InMemoryRegistry::new();
        registry.register(&hash(3), RegistryMetadata::new("first", "01")).unwrap();
        registry.register(&hash(3), RegistryMetadata::new("second", "02")).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup(&hash(3)).unwrap(),
            Lookup::Seen(RegistryMetadata::new("first", "01"))
        );
    }

    #[test]
    fn concurrent_registration_keeps_one_entry_per_hash() {
        let registry = Arc::new(InMemoryRegistry::new());
        let handles: Vec<_> = (0..8u8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for byte in 0..16u8 {
                        registry
                            .register(&hash(byte), RegistryMetadata::new(format!("w{worker}"), "00"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 16);
    }
}
