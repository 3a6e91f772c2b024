//! Fragment: the immutable, shipped unit of the graph representation.
//!
//! A [`Fragment`] owns an ordered sequence of nodes, a designated entry node,
//! a provenance root, an opaque proof blob and the entropy certificate issued
//! at admission. Fragments are never mutated once built; the core only
//! inspects and hashes them.
//!
//! Construction performs no structural checks. A front-end may hand over a
//! fragment with a missing entry, duplicate identities or dangling references;
//! the validator reports those all at once.

use std::collections::{HashMap, HashSet};

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Bfs;

use crate::certificate::EntropyCertificate;
use crate::error::CoreError;
use crate::hash::hash_nodes;
use crate::id::{NodeId, SemanticHash};
use crate::node::Node;
use crate::provenance::{Provenance, ProvenanceLog};

/// Node-reference graph of a fragment. Edge weights are slot indices.
pub type WiringGraph = DiGraphMap<NodeId, usize>;

/// An immutable graph fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    nodes: Vec<Node>,
    entry: NodeId,
    provenance: Provenance,
    proof: Vec<u8>,
    entropy_certificate: EntropyCertificate,
    /// First position of each identity in `nodes`.
    index: HashMap<NodeId, usize>,
}

impl Fragment {
    /// Assembles a fragment from its parts without structural checks.
    pub fn new(
        nodes: Vec<Node>,
        entry: NodeId,
        provenance: Provenance,
        proof: Vec<u8>,
        entropy_certificate: EntropyCertificate,
    ) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        for (pos, node) in nodes.iter().enumerate() {
            index.entry(node.id()).or_insert(pos);
        }
        Fragment {
            nodes,
            entry,
            provenance,
            proof,
            entropy_certificate,
            index,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn entry_node(&self) -> Option<&Node> {
        self.node(self.entry)
    }

    /// Looks up a node by identity (first occurrence wins).
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&pos| &self.nodes[pos])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn proof(&self) -> &[u8] {
        &self.proof
    }

    pub fn entropy_certificate(&self) -> &EntropyCertificate {
        &self.entropy_certificate
    }

    /// The canonical content hash of this fragment.
    pub fn semantic_hash(&self) -> SemanticHash {
        hash_nodes(&self.nodes)
    }

    /// Identities appearing more than once, in stored order.
    pub fn duplicate_ids(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        self.nodes
            .iter()
            .map(Node::id)
            .filter(|id| !seen.insert(*id) && reported.insert(*id))
            .collect()
    }

    /// `(referencing node, missing target)` pairs, in stored and slot order.
    pub fn dangling_references(&self) -> Vec<(NodeId, NodeId)> {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.references()
                    .into_iter()
                    .filter(move |target| !self.contains(*target))
                    .map(move |target| (node.id(), target))
            })
            .collect()
    }

    /// Builds the node-reference graph. References to absent nodes are omitted.
    pub fn wiring(&self) -> WiringGraph {
        let mut graph = WiringGraph::with_capacity(self.nodes.len(), self.nodes.len());
        for node in &self.nodes {
            graph.add_node(node.id());
        }
        for node in &self.nodes {
            for (slot, target) in node.references().into_iter().enumerate() {
                if self.contains(target) {
                    graph.add_edge(node.id(), target, slot);
                }
            }
        }
        graph
    }

    /// Identities reachable from the entry node (entry included).
    pub fn reachable(&self) -> HashSet<NodeId> {
        let mut reached = HashSet::new();
        if !self.contains(self.entry) {
            return reached;
        }
        let graph = self.wiring();
        let mut bfs = Bfs::new(&graph, self.entry);
        while let Some(id) = bfs.next(&graph) {
            reached.insert(id);
        }
        reached
    }

    /// Entry-first structural order.
    ///
    /// The entry node, then a depth-first pre-order walk over references in
    /// slot order, then every node unreachable from the entry in stored order.
    /// Each identity appears once.
    pub fn structural_order(&self) -> Vec<&Node> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut seen = HashSet::with_capacity(self.nodes.len());

        let mut stack = Vec::new();
        if self.contains(self.entry) {
            stack.push(self.entry);
        }
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.node(id) else { continue };
            order.push(node);
            for target in node.references().into_iter().rev() {
                if !seen.contains(&target) && self.contains(target) {
                    stack.push(target);
                }
            }
        }

        for node in &self.nodes {
            if seen.insert(node.id()) {
                order.push(node);
            }
        }
        order
    }
}

/// Incremental builder used by front-ends and tests.
#[derive(Debug, Default)]
pub struct FragmentBuilder {
    nodes: Vec<Node>,
    entry: Option<NodeId>,
    history: ProvenanceLog,
    proof: Vec<u8>,
    entropy_certificate: EntropyCertificate,
}

impl FragmentBuilder {
    pub fn new() -> Self {
        FragmentBuilder::default()
    }

    /// Appends a node and returns its identity.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.push(node);
        id
    }

    pub fn entry(&mut self, id: NodeId) -> &mut Self {
        self.entry = Some(id);
        self
    }

    /// Records one transformation step in the provenance history.
    pub fn record_step(&mut self, step: &[u8]) -> &mut Self {
        self.history.record(step);
        self
    }

    pub fn proof(&mut self, blob: impl Into<Vec<u8>>) -> &mut Self {
        self.proof = blob.into();
        self
    }

    pub fn entropy_certificate(&mut self, certificate: EntropyCertificate) -> &mut Self {
        self.entropy_certificate = certificate;
        self
    }

    /// Seals the builder. Fails only when no entry node was designated.
    pub fn build(self) -> Result<Fragment, CoreError> {
        let entry = self.entry.ok_or(CoreError::NoEntry)?;
        Ok(Fragment::new(
            self.nodes,
            entry,
            self.history.seal(),
            self.proof,
            self.entropy_certificate,
        ))
    }
}
