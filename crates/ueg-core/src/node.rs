//! The closed node taxonomy.
//!
//! Exactly seven structural kinds exist ([`NodeKind`]). Every [`Node`] is
//! built from a kind plus a [`Tags`] value; there is no untagged state.
//! Consumers dispatching on kind match exhaustively, so adding an eighth
//! kind is a compile error everywhere it matters.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::TaxonomyViolation;
use crate::hash::hash_node;
use crate::id::{NodeId, SemanticHash};
use crate::tags::Tags;

/// Longest accepted proof reference or obligation identifier.
pub const MAX_IDENTIFIER_LEN: usize = 256;

/// Returns true for a non-empty, correctly shaped external identifier.
///
/// Accepted characters are ASCII alphanumerics and `_ - : . /`.
pub fn is_well_formed_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_IDENTIFIER_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.' | b'/'))
}

/// Returns true for a name usable as a parameter in generated code: an
/// ASCII letter or `_`, then ASCII alphanumerics and `_`.
pub fn is_identifier(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' => {}
        _ => return false,
    }
    s.len() <= MAX_IDENTIFIER_LEN && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Returns true for a type annotation built only from identifiers, commas,
/// spaces and balanced `[]`, `<>` and `()` brackets.
pub fn is_well_formed_annotation(s: &str) -> bool {
    if s.trim().is_empty() || s.len() > MAX_IDENTIFIER_LEN {
        return false;
    }
    let mut open = Vec::new();
    let mut word = String::new();
    for c in s.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        if !word.is_empty() && !is_identifier(&word) {
            return false;
        }
        word.clear();
        match c {
            ' ' | ',' => {}
            '[' | '<' | '(' => open.push(c),
            ']' | '>' | ')' => {
                let expected = match c {
                    ']' => '[',
                    '>' => '<',
                    _ => '(',
                };
                if open.pop() != Some(expected) {
                    return false;
                }
            }
            _ => return false,
        }
    }
    open.is_empty()
}

// ---------------------------------------------------------------------------
// Node payload types
// ---------------------------------------------------------------------------

/// Opaque reference to a proof held by the external verifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofRef(pub String);

impl ProofRef {
    pub fn new(s: impl Into<String>) -> Self {
        ProofRef(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        is_well_formed_identifier(&self.0)
    }
}

impl fmt::Display for ProofRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of an externally discharged proof obligation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObligationId(pub String);

impl ObligationId {
    pub fn new(s: impl Into<String>) -> Self {
        ObligationId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        is_well_formed_identifier(&self.0)
    }
}

impl fmt::Display for ObligationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The effect a `Sigma` node performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Io,
    Mut,
    Throw,
    Async,
    Terminate,
}

impl EffectKind {
    pub const ALL: [EffectKind; 5] = [
        EffectKind::Io,
        EffectKind::Mut,
        EffectKind::Throw,
        EffectKind::Async,
        EffectKind::Terminate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Io => "io",
            EffectKind::Mut => "mut",
            EffectKind::Throw => "throw",
            EffectKind::Async => "async",
            EffectKind::Terminate => "terminate",
        }
    }

    /// Parses the lower-case effect name used on the wire.
    pub fn from_name(name: &str) -> Option<EffectKind> {
        EffectKind::ALL.into_iter().find(|e| e.name() == name)
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type: a front-end name plus an optional refinement proof.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Type {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement: Option<ProofRef>,
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type { name: name.into(), refinement: None }
    }

    pub fn refined(name: impl Into<String>, proof: ProofRef) -> Self {
        Type { name: name.into(), refinement: Some(proof) }
    }

    /// Shape check on the annotation only; the refinement is checked apart.
    pub fn is_well_formed(&self) -> bool {
        is_well_formed_annotation(&self.name)
    }
}

/// A `Lambda` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Param { name: name.into(), ty }
    }

    /// True when both the name and the type annotation can be pasted into
    /// generated source as-is.
    pub fn is_well_formed(&self) -> bool {
        is_identifier(&self.name) && self.ty.is_well_formed()
    }
}

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// The seven structural node kinds with their payloads.
///
/// Expression slots reference other nodes of the same fragment by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Function abstraction.
    Lambda { params: Vec<Param>, body: NodeId },
    /// Control-flow merge point over ordered incoming values.
    Phi { incoming: SmallVec<[NodeId; 4]> },
    /// Effectful computation.
    Sigma { effect: EffectKind, inner: NodeId },
    /// Region/parallel composition.
    Pi { regions: SmallVec<[NodeId; 4]> },
    /// Proof-carrying wrapper.
    Gamma { proof: ProofRef, inner: NodeId },
    /// External proof obligation marker.
    Omega { obligation: ObligationId },
    /// Build/replay record.
    Delta { trace: Vec<u8> },
}

impl NodeKind {
    /// The payload-free discriminant of this kind.
    pub fn tag(&self) -> KindTag {
        match self {
            NodeKind::Lambda { .. } => KindTag::Lambda,
            NodeKind::Phi { .. } => KindTag::Phi,
            NodeKind::Sigma { .. } => KindTag::Sigma,
            NodeKind::Pi { .. } => KindTag::Pi,
            NodeKind::Gamma { .. } => KindTag::Gamma,
            NodeKind::Omega { .. } => KindTag::Omega,
            NodeKind::Delta { .. } => KindTag::Delta,
        }
    }

    /// Nodes referenced by this kind's expression slots, in slot order.
    pub fn references(&self) -> SmallVec<[NodeId; 4]> {
        match self {
            NodeKind::Lambda { body, .. } => SmallVec::from_slice(&[*body]),
            NodeKind::Phi { incoming } => incoming.clone(),
            NodeKind::Sigma { inner, .. } => SmallVec::from_slice(&[*inner]),
            NodeKind::Pi { regions } => regions.clone(),
            NodeKind::Gamma { inner, .. } => SmallVec::from_slice(&[*inner]),
            NodeKind::Omega { .. } | NodeKind::Delta { .. } => SmallVec::new(),
        }
    }
}

/// Payload-free node-kind discriminant with a stable wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KindTag {
    Lambda,
    Phi,
    Sigma,
    Pi,
    Gamma,
    Omega,
    Delta,
}

impl KindTag {
    pub const ALL: [KindTag; 7] = [
        KindTag::Lambda,
        KindTag::Phi,
        KindTag::Sigma,
        KindTag::Pi,
        KindTag::Gamma,
        KindTag::Omega,
        KindTag::Delta,
    ];

    pub fn code(self) -> u8 {
        match self {
            KindTag::Lambda => 0,
            KindTag::Phi => 1,
            KindTag::Sigma => 2,
            KindTag::Pi => 3,
            KindTag::Gamma => 4,
            KindTag::Omega => 5,
            KindTag::Delta => 6,
        }
    }

    /// Resolves a wire code. Any code outside the taxonomy is fatal.
    pub fn from_code(code: u8) -> Result<KindTag, TaxonomyViolation> {
        match code {
            0 => Ok(KindTag::Lambda),
            1 => Ok(KindTag::Phi),
            2 => Ok(KindTag::Sigma),
            3 => Ok(KindTag::Pi),
            4 => Ok(KindTag::Gamma),
            5 => Ok(KindTag::Omega),
            6 => Ok(KindTag::Delta),
            _ => Err(TaxonomyViolation { code, node: None }),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            KindTag::Lambda => "λ",
            KindTag::Phi => "Φ",
            KindTag::Sigma => "Σ",
            KindTag::Pi => "Π",
            KindTag::Gamma => "Γ",
            KindTag::Omega => "Ω",
            KindTag::Delta => "Δ",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KindTag::Lambda => "Lambda",
            KindTag::Phi => "Phi",
            KindTag::Sigma => "Sigma",
            KindTag::Pi => "Pi",
            KindTag::Gamma => "Gamma",
            KindTag::Omega => "Omega",
            KindTag::Delta => "Delta",
        }
    }

    /// True for kinds carrying a proof reference or obligation.
    pub fn is_proof_carrying(self) -> bool {
        matches!(self, KindTag::Gamma | KindTag::Omega)
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Nodes and values
// ---------------------------------------------------------------------------

/// An immutable graph node: identity, kind and mandatory tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    tags: Tags,
}

impl Node {
    /// Creates a node with a fresh identity.
    pub fn new(kind: NodeKind, tags: Tags) -> Self {
        Node::with_id(NodeId::new(), kind, tags)
    }

    /// Creates a node with a caller-supplied identity.
    pub fn with_id(id: NodeId, kind: NodeKind, tags: Tags) -> Self {
        Node { id, kind, tags }
    }

    pub fn lambda(params: Vec<Param>, body: NodeId, tags: Tags) -> Self {
        Node::new(NodeKind::Lambda { params, body }, tags)
    }

    pub fn phi(incoming: impl IntoIterator<Item = NodeId>, tags: Tags) -> Self {
        Node::new(NodeKind::Phi { incoming: incoming.into_iter().collect() }, tags)
    }

    pub fn sigma(effect: EffectKind, inner: NodeId, tags: Tags) -> Self {
        Node::new(NodeKind::Sigma { effect, inner }, tags)
    }

    pub fn pi(regions: impl IntoIterator<Item = NodeId>, tags: Tags) -> Self {
        Node::new(NodeKind::Pi { regions: regions.into_iter().collect() }, tags)
    }

    pub fn gamma(proof: ProofRef, inner: NodeId, tags: Tags) -> Self {
        Node::new(NodeKind::Gamma { proof, inner }, tags)
    }

    pub fn omega(obligation: ObligationId, tags: Tags) -> Self {
        Node::new(NodeKind::Omega { obligation }, tags)
    }

    pub fn delta(trace: Vec<u8>, tags: Tags) -> Self {
        Node::new(NodeKind::Delta { trace }, tags)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_tag(&self) -> KindTag {
        self.kind.tag()
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn references(&self) -> SmallVec<[NodeId; 4]> {
        self.kind.references()
    }
}

/// A node paired with its derived semantic hash.
///
/// The hash is computed on construction and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    node: Node,
    semantic_hash: SemanticHash,
}

impl Value {
    pub fn new(node: Node) -> Self {
        let semantic_hash = hash_node(node.kind_tag(), node.tags());
        Value { node, semantic_hash }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn semantic_hash(&self) -> SemanticHash {
        self.semantic_hash
    }

    pub fn into_node(self) -> Node {
        self.node
    }
}
