//! Canonical semantic hashing using blake3.
//!
//! The hash of a fragment identifies its computational content independent of
//! node identity, textual names and stored order.
//!
//! # Canonical form
//!
//! Each node contributes an 8-byte record: its kind code followed by the
//! canonical tag bytes (lineage, concurrency, property bits, entropy budget).
//! Nothing else about a node is hashed, so parameter names, proof references
//! and node identities never influence the result.
//!
//! Records are sorted before they are fed to the hasher. Two fragments holding
//! the same multiset of (kind, tags) pairs hash identically whatever order the
//! front-end stored them in. The record count is hashed first so a fragment
//! cannot collide with a prefix of itself.

use crate::id::SemanticHash;
use crate::node::{KindTag, Node};
use crate::tags::Tags;

/// Domain separator for fragment hashes.
const FRAGMENT_DOMAIN: &[u8] = b"ueg.fragment.v1";

/// Domain separator for single-node value hashes.
const NODE_DOMAIN: &[u8] = b"ueg.node.v1";

type NodeRecord = [u8; 8];

fn node_record(kind: KindTag, tags: &Tags) -> NodeRecord {
    let t = tags.canonical_bytes();
    [kind.code(), t[0], t[1], t[2], t[3], t[4], t[5], t[6]]
}

/// Hashes one node's content (kind + tags).
pub fn hash_node(kind: KindTag, tags: &Tags) -> SemanticHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(NODE_DOMAIN);
    hasher.update(&node_record(kind, tags));
    hasher.finalize().into()
}

/// Hashes a sequence of nodes into a single 256-bit fragment hash.
///
/// Order-independent: the per-node records are sorted before hashing.
pub fn hash_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> SemanticHash {
    let mut records: Vec<NodeRecord> = nodes
        .into_iter()
        .map(|n| node_record(n.kind_tag(), n.tags()))
        .collect();
    records.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    hasher.update(FRAGMENT_DOMAIN);
    hasher.update(&(records.len() as u64).to_le_bytes());
    for record in &records {
        hasher.update(record);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use crate::node::{EffectKind, ObligationId, Param, ProofRef, Type};
    use crate::tags::{ConcurrencyModel, Property, PropertySet, SafetyLineage};

    fn owned(props: impl Into<PropertySet>) -> Tags {
        Tags::new(SafetyLineage::Owned, ConcurrencyModel::Seq, props)
    }

    fn sample(names: (&str, &str)) -> Vec<Node> {
        let phi = Node::phi(Vec::new(), owned([Property::Terminating]));
        let lambda = Node::lambda(
            vec![Param::new(names.0, Type::named("int"))],
            phi.id(),
            owned([Property::Terminating, Property::NoOverflow]),
        );
        let gamma = Node::gamma(ProofRef::new(names.1), lambda.id(), owned(PropertySet::empty()));
        vec![lambda, phi, gamma]
    }

    #[test]
    fn test_hash_deterministic() {
        let nodes = sample(("n", "z3:a"));
        assert_eq!(hash_nodes(&nodes), hash_nodes(&nodes));
    }

    #[test]
    fn test_hash_ignores_identity_and_names() {
        let a = sample(("n", "z3:a"));
        let b = sample(("count", "z3:b"));
        assert_ne!(a[0].id(), b[0].id());
        assert_eq!(hash_nodes(&a), hash_nodes(&b));
    }

    #[test]
    fn test_hash_ignores_stored_order() {
        let nodes = sample(("n", "z3:a"));
        let reversed: Vec<Node> = nodes.iter().rev().cloned().collect();
        assert_eq!(hash_nodes(&nodes), hash_nodes(&reversed));
    }

    #[test]
    fn test_hash_changes_on_tag_change() {
        let nodes = sample(("n", "z3:a"));
        let mut changed = nodes.clone();
        changed[1] = Node::with_id(
            changed[1].id(),
            changed[1].kind().clone(),
            owned([Property::Terminating, Property::DeterministicFp]),
        );
        assert_ne!(hash_nodes(&nodes), hash_nodes(&changed));
    }

    #[test]
    fn test_hash_changes_on_kind_change() {
        let tags = owned(PropertySet::empty());
        let inner = NodeId::new();
        let sigma = [Node::sigma(EffectKind::Io, inner, tags.clone())];
        let gamma = [Node::gamma(ProofRef::new("p"), inner, tags)];
        assert_ne!(hash_nodes(&sigma), hash_nodes(&gamma));
    }

    #[test]
    fn test_hash_counts_duplicates() {
        let tags = owned(PropertySet::empty());
        let one = vec![Node::omega(ObligationId::new("a"), tags.clone())];
        let two = vec![
            Node::omega(ObligationId::new("a"), tags.clone()),
            Node::omega(ObligationId::new("b"), tags),
        ];
        assert_ne!(hash_nodes(&one), hash_nodes(&two));
    }

    #[test]
    fn test_empty_fragment_hash_is_stable() {
        let empty: Vec<Node> = Vec::new();
        assert_eq!(hash_nodes(&empty), hash_nodes(&empty));
        assert_ne!(hash_nodes(&empty), hash_nodes(&sample(("n", "p"))));
    }

    #[test]
    fn test_node_hash_differs_from_singleton_fragment_hash() {
        let node = Node::delta(vec![9], owned(PropertySet::empty()));
        assert_ne!(
            hash_node(node.kind_tag(), node.tags()),
            hash_nodes(std::slice::from_ref(&node))
        );
    }
}
