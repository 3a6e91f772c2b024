//! Property tests for the semantic hash.
//!
//! Fragments are generated as lists of (kind, tags) pairs; identities, names
//! and payload contents are randomised independently so only the hashed
//! content is held fixed.

use proptest::prelude::*;

use ueg_core::{
    ConcurrencyModel, EffectKind, EntropyCertificate, Fragment, KindTag, Node, NodeId, NodeKind,
    ObligationId, Param, ProofRef, Property, PropertySet, Provenance, SafetyLineage, Tags, Type,
    WireFragment,
};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_tags() -> impl Strategy<Value = Tags> {
    (
        prop::sample::select(SafetyLineage::ALL.to_vec()),
        prop::sample::select(ConcurrencyModel::ALL.to_vec()),
        prop::sample::subsequence(Property::ALL.to_vec(), 0..=Property::ALL.len()),
        any::<u32>(),
    )
        .prop_map(|(lineage, concurrency, props, budget)| {
            Tags::new(lineage, concurrency, props.into_iter().collect::<PropertySet>())
                .with_entropy_budget(budget)
        })
}

fn arb_shape() -> impl Strategy<Value = Vec<(KindTag, Tags)>> {
    prop::collection::vec(
        (prop::sample::select(KindTag::ALL.to_vec()), arb_tags()),
        1..12,
    )
}

/// Builds a node of `kind` whose payload is derived from `salt`, so two calls
/// with different salts differ in everything except kind and tags.
fn materialise(kind: KindTag, tags: Tags, salt: &str, targets: &[NodeId]) -> Node {
    let target = targets.first().copied().unwrap_or_default();
    let node_kind = match kind {
        KindTag::Lambda => NodeKind::Lambda {
            params: vec![Param::new(format!("arg_{salt}"), Type::named(salt))],
            body: target,
        },
        KindTag::Phi => NodeKind::Phi { incoming: targets.iter().copied().collect() },
        KindTag::Sigma => NodeKind::Sigma { effect: EffectKind::Io, inner: target },
        KindTag::Pi => NodeKind::Pi { regions: targets.iter().copied().collect() },
        KindTag::Gamma => NodeKind::Gamma { proof: ProofRef::new(format!("z3:{salt}")), inner: target },
        KindTag::Omega => NodeKind::Omega { obligation: ObligationId::new(format!("ob-{salt}")) },
        KindTag::Delta => NodeKind::Delta { trace: salt.as_bytes().to_vec() },
    };
    Node::new(node_kind, tags)
}

fn fragment_from(shape: &[(KindTag, Tags)], salt: &str) -> Fragment {
    let mut nodes: Vec<Node> = Vec::with_capacity(shape.len());
    for (kind, tags) in shape {
        let targets: Vec<NodeId> = nodes.last().map(|n| vec![n.id()]).unwrap_or_default();
        nodes.push(materialise(*kind, tags.clone(), salt, &targets));
    }
    let entry = nodes.last().map(Node::id).unwrap_or_default();
    Fragment::new(
        nodes,
        entry,
        Provenance::default(),
        Vec::new(),
        EntropyCertificate::default(),
    )
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn hash_is_deterministic(shape in arb_shape()) {
        let fragment = fragment_from(&shape, "a");
        prop_assert_eq!(fragment.semantic_hash(), fragment.semantic_hash());
        prop_assert_eq!(fragment.semantic_hash(), fragment.clone().semantic_hash());
    }

    #[test]
    fn hash_ignores_identity_and_names(shape in arb_shape()) {
        let first = fragment_from(&shape, "alpha");
        let second = fragment_from(&shape, "omega_prime");
        prop_assert_eq!(first.semantic_hash(), second.semantic_hash());
    }

    #[test]
    fn hash_ignores_stored_order(shape in arb_shape(), seed in any::<u64>()) {
        let fragment = fragment_from(&shape, "x");
        let mut shuffled = fragment.nodes().to_vec();
        // deterministic rotation plus reversal stands in for a shuffle
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        if seed % 2 == 0 {
            shuffled.reverse();
        }
        let reordered = Fragment::new(
            shuffled,
            fragment.entry(),
            Provenance::default(),
            Vec::new(),
            EntropyCertificate::default(),
        );
        prop_assert_eq!(fragment.semantic_hash(), reordered.semantic_hash());
    }

    #[test]
    fn hash_sees_any_tag_change(shape in arb_shape(), index in any::<prop::sample::Index>()) {
        let fragment = fragment_from(&shape, "t");
        let mut changed = shape.clone();
        let slot = index.index(changed.len());
        let tags = &mut changed[slot].1;
        tags.entropy_budget = tags.entropy_budget.wrapping_add(1);
        prop_assert_ne!(fragment.semantic_hash(), fragment_from(&changed, "t").semantic_hash());
    }

    #[test]
    fn wire_round_trip_preserves_hash(shape in arb_shape()) {
        let fragment = fragment_from(&shape, "wire");
        let decoded = WireFragment::encode(&fragment).decode().unwrap();
        prop_assert_eq!(decoded.semantic_hash(), fragment.semantic_hash());
    }
}
