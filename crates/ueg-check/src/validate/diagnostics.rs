//! Validation diagnostics.
//!
//! [`Violation`] names the failing rule, the node involved where there is
//! one, and the measured values behind the decision, so a rejection can be
//! reproduced without re-running the validator.

use serde::{Deserialize, Serialize};

use ueg_core::{KindTag, NodeId, RegistryMetadata, SemanticHash};

/// One failed validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    /// The designated entry node is not part of the fragment.
    #[error("entry node {entry} is not in the fragment")]
    MissingEntry { entry: NodeId },

    /// Two or more nodes share one identity.
    #[error("node identity {node} is used more than once")]
    DuplicateNode { node: NodeId },

    /// An expression slot points at a node outside the fragment.
    #[error("node {node} references {target}, which is not in the fragment")]
    DanglingReference { node: NodeId, target: NodeId },

    /// A node arrived across the untrusted boundary without tags.
    #[error("node {node} carries no tags")]
    MissingTags { node: NodeId },

    /// A node's payload could not be decoded.
    #[error("node {node} is malformed: {detail}")]
    MalformedNode { node: NodeId, detail: String },

    /// A node matches a forbidden tag combination.
    #[error("node {node} violates policy '{policy}': {reason}")]
    ForbiddenCombination {
        node: NodeId,
        /// Name of the matched policy rule.
        policy: String,
        reason: String,
    },

    /// A node's entropy budget has been debited to zero.
    #[error("node {node} has exhausted its entropy budget")]
    EntropyBudgetExhausted { node: NodeId },

    #[error("fragment carries no entropy certificate")]
    MissingCertificate,

    #[error("entropy certificate is not decodable")]
    MalformedCertificate,

    /// The certified ratio is outside the configured obfuscation budget.
    #[error("certified entropy ratio {ratio:.3} for {language} exceeds budget {budget:.3}")]
    ObfuscationBudgetExceeded {
        ratio: f64,
        budget: f64,
        language: String,
    },

    /// A Gamma proof reference or Omega obligation id is badly shaped.
    #[error("{kind} node {node} has malformed proof reference '{reference}'")]
    MalformedProofReference {
        node: NodeId,
        kind: KindTag,
        reference: String,
    },

    /// A Lambda parameter name is not an identifier, or its type annotation
    /// is not built from identifiers and balanced brackets.
    #[error("parameter '{param}: {annotation}' of node {node} cannot appear in generated code")]
    MalformedParameter {
        node: NodeId,
        param: String,
        annotation: String,
    },

    /// A Lambda parameter type carries a badly shaped refinement proof.
    #[error("parameter '{param}' of node {node} has malformed refinement '{reference}'")]
    MalformedRefinement {
        node: NodeId,
        param: String,
        reference: String,
    },

    /// The external verifier rejected a proof. `reason` is its verbatim text.
    #[error("verifier rejected '{reference}' on node {node}: {reason}")]
    VerificationFailed {
        node: NodeId,
        reference: String,
        reason: String,
    },

    /// The provenance blob is not a single 32-byte root.
    #[error("provenance root must be 32 bytes, found {len}")]
    MalformedProvenance { len: usize },

    /// The semantic hash is already registered and policy forbids duplicates.
    #[error("semantic hash {hash} was already registered by {}", .metadata.origin)]
    DuplicateHash {
        hash: SemanticHash,
        metadata: RegistryMetadata,
    },

    /// The configured registry could not answer.
    #[error("hash registry unavailable: {reason}")]
    RegistryUnavailable { reason: String },
}

impl Violation {
    /// The node the violation is about, if it concerns a single node.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Violation::MissingEntry { entry } => Some(*entry),
            Violation::DuplicateNode { node }
            | Violation::DanglingReference { node, .. }
            | Violation::MissingTags { node }
            | Violation::MalformedNode { node, .. }
            | Violation::ForbiddenCombination { node, .. }
            | Violation::EntropyBudgetExhausted { node }
            | Violation::MalformedProofReference { node, .. }
            | Violation::MalformedParameter { node, .. }
            | Violation::MalformedRefinement { node, .. }
            | Violation::VerificationFailed { node, .. } => Some(*node),
            Violation::MissingCertificate
            | Violation::MalformedCertificate
            | Violation::ObfuscationBudgetExceeded { .. }
            | Violation::MalformedProvenance { .. }
            | Violation::DuplicateHash { .. }
            | Violation::RegistryUnavailable { .. } => None,
        }
    }
}

/// Informational finding that does not by itself reject a fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// The hash is already registered; a legitimate dedup under the default policy.
    KnownHash {
        hash: SemanticHash,
        metadata: RegistryMetadata,
    },
}

/// Everything one validation pass found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub fragment_hash: SemanticHash,
    pub violations: Vec<Violation>,
    pub notices: Vec<Notice>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations attached to `node`.
    pub fn violations_for(&self, node: NodeId) -> impl Iterator<Item = &Violation> + '_ {
        self.violations.iter().filter(move |v| v.node() == Some(node))
    }
}
