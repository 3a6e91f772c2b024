//! Untrusted wire form of a fragment.
//!
//! Fragments crossing a process or trust boundary travel as JSON
//! [`WireFragment`] values. The wire form is loose:
//! kinds are raw numeric codes, tags are optional and every payload field is
//! optional. [`WireFragment::decode`] is the single place where such input is
//! turned into typed [`Fragment`] values.
//!
//! Decoding is all-or-nothing. A kind code outside the taxonomy aborts with a
//! [`TaxonomyViolation`]; every other problem (missing tags, missing payload
//! fields, unknown effect names) is collected so the caller sees the complete
//! list in one pass.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::certificate::EntropyCertificate;
use crate::error::{CoreError, TaxonomyViolation};
use crate::fragment::Fragment;
use crate::id::NodeId;
use crate::node::{EffectKind, KindTag, Node, NodeKind, ObligationId, Param, ProofRef};
use crate::provenance::Provenance;
use crate::tags::Tags;

/// A fragment as received from an untrusted producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFragment {
    pub nodes: Vec<WireNode>,
    pub entry: NodeId,
    #[serde(default)]
    pub provenance: Vec<u8>,
    #[serde(default)]
    pub proof: Vec<u8>,
    #[serde(default)]
    pub entropy_certificate: Vec<u8>,
}

/// A node as received from an untrusted producer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireNode {
    pub id: NodeId,
    /// Raw kind code; only 0..=6 are defined.
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incoming: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obligation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<u8>>,
}

/// One malformed node found while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum DecodeIssue {
    /// The node arrived without its mandatory tags.
    #[error("node {node} carries no tags")]
    MissingTags { node: NodeId },

    /// A payload field required by the node's kind is absent.
    #[error("{kind} node {node} is missing field '{field}'")]
    MissingField {
        node: NodeId,
        kind: KindTag,
        field: String,
    },

    /// A Sigma node names an effect outside the known set.
    #[error("Sigma node {node} has unknown effect '{effect}'")]
    UnknownEffect { node: NodeId, effect: String },
}

impl DecodeIssue {
    pub fn node(&self) -> NodeId {
        match self {
            DecodeIssue::MissingTags { node }
            | DecodeIssue::MissingField { node, .. }
            | DecodeIssue::UnknownEffect { node, .. } => *node,
        }
    }
}

/// Why a wire fragment could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// A kind code outside the seven-kind taxonomy. Fatal.
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyViolation),

    /// One or more nodes were malformed.
    #[error("{} malformed node(s)", .0.len())]
    Malformed(Vec<DecodeIssue>),
}

impl WireFragment {
    pub fn from_json(text: &str) -> Result<WireFragment, CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Encodes a typed fragment. Lossless: `decode` returns an equal fragment.
    pub fn encode(fragment: &Fragment) -> WireFragment {
        WireFragment {
            nodes: fragment.nodes().iter().map(WireNode::encode).collect(),
            entry: fragment.entry(),
            provenance: fragment.provenance().as_bytes().to_vec(),
            proof: fragment.proof().to_vec(),
            entropy_certificate: fragment.entropy_certificate().as_bytes().to_vec(),
        }
    }

    /// Checks every kind code against the taxonomy.
    pub fn check_taxonomy(&self) -> Result<(), TaxonomyViolation> {
        for node in &self.nodes {
            KindTag::from_code(node.kind).map_err(|mut violation| {
                violation.node = Some(node.id);
                violation
            })?;
        }
        Ok(())
    }

    /// Decodes into a typed fragment.
    pub fn decode(&self) -> Result<Fragment, DecodeError> {
        self.check_taxonomy()?;

        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut issues = Vec::new();
        for wire in &self.nodes {
            match wire.decode() {
                Ok(node) => nodes.push(node),
                Err(mut node_issues) => issues.append(&mut node_issues),
            }
        }
        if !issues.is_empty() {
            return Err(DecodeError::Malformed(issues));
        }

        Ok(Fragment::new(
            nodes,
            self.entry,
            Provenance(self.provenance.clone()),
            self.proof.clone(),
            EntropyCertificate(self.entropy_certificate.clone()),
        ))
    }
}

impl From<&Fragment> for WireFragment {
    fn from(fragment: &Fragment) -> Self {
        WireFragment::encode(fragment)
    }
}

impl WireNode {
    pub fn encode(node: &Node) -> WireNode {
        let mut wire = WireNode {
            id: node.id(),
            kind: node.kind_tag().code(),
            tags: Some(node.tags().clone()),
            ..WireNode::default()
        };
        match node.kind() {
            NodeKind::Lambda { params, body } => {
                wire.params = params.clone();
                wire.body = Some(*body);
            }
            NodeKind::Phi { incoming } => wire.incoming = incoming.to_vec(),
            NodeKind::Sigma { effect, inner } => {
                wire.effect = Some(effect.name().to_string());
                wire.inner = Some(*inner);
            }
            NodeKind::Pi { regions } => wire.regions = regions.to_vec(),
            NodeKind::Gamma { proof, inner } => {
                wire.proof = Some(proof.0.clone());
                wire.inner = Some(*inner);
            }
            NodeKind::Omega { obligation } => wire.obligation = Some(obligation.0.clone()),
            NodeKind::Delta { trace } => wire.trace = Some(trace.clone()),
        }
        wire
    }

    /// Decodes one node, reporting every issue it has.
    ///
    /// An unknown kind code is reported as [`DecodeError::Taxonomy`] by
    /// [`WireFragment::decode`] before this is reached; called directly it
    /// yields no issues for such a node but still refuses to decode it.
    pub fn decode(&self) -> Result<Node, Vec<DecodeIssue>> {
        let mut issues = Vec::new();
        let id = self.id;

        if self.tags.is_none() {
            issues.push(DecodeIssue::MissingTags { node: id });
        }

        let Ok(kind) = KindTag::from_code(self.kind) else {
            return Err(issues);
        };

        let mut require = |field: &str, present: bool| {
            if !present {
                issues.push(DecodeIssue::MissingField {
                    node: id,
                    kind,
                    field: field.to_string(),
                });
            }
        };

        let node_kind = match kind {
            KindTag::Lambda => {
                require("body", self.body.is_some());
                self.body.map(|body| NodeKind::Lambda {
                    params: self.params.clone(),
                    body,
                })
            }
            KindTag::Phi => Some(NodeKind::Phi {
                incoming: self.incoming.iter().copied().collect(),
            }),
            KindTag::Sigma => {
                require("effect", self.effect.is_some());
                require("inner", self.inner.is_some());
                let effect = match self.effect.as_deref() {
                    Some(name) => match EffectKind::from_name(name) {
                        Some(effect) => Some(effect),
                        None => {
                            issues.push(DecodeIssue::UnknownEffect {
                                node: id,
                                effect: name.to_string(),
                            });
                            None
                        }
                    },
                    None => None,
                };
                match (effect, self.inner) {
                    (Some(effect), Some(inner)) => Some(NodeKind::Sigma { effect, inner }),
                    _ => None,
                }
            }
            KindTag::Pi => Some(NodeKind::Pi {
                regions: self.regions.iter().copied().collect(),
            }),
            KindTag::Gamma => {
                require("proof", self.proof.is_some());
                require("inner", self.inner.is_some());
                match (&self.proof, self.inner) {
                    (Some(proof), Some(inner)) => Some(NodeKind::Gamma {
                        proof: ProofRef::new(proof.clone()),
                        inner,
                    }),
                    _ => None,
                }
            }
            KindTag::Omega => {
                require("obligation", self.obligation.is_some());
                self.obligation.as_ref().map(|obligation| NodeKind::Omega {
                    obligation: ObligationId::new(obligation.clone()),
                })
            }
            KindTag::Delta => {
                require("trace", self.trace.is_some());
                self.trace.as_ref().map(|trace| NodeKind::Delta { trace: trace.clone() })
            }
        };

        match (node_kind, &self.tags) {
            (Some(node_kind), Some(tags)) if issues.is_empty() => {
                Ok(Node::with_id(id, node_kind, tags.clone()))
            }
            _ => Err(issues),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentBuilder;
    use crate::node::Type;
    use crate::tags::{ConcurrencyModel, Property, PropertySet, SafetyLineage};

    fn tags() -> Tags {
        Tags::new(SafetyLineage::Owned, ConcurrencyModel::Seq, [Property::Terminating])
    }

    fn every_kind() -> Fragment {
        let mut b = FragmentBuilder::new();
        let omega = b.add(Node::omega(ObligationId::new("ob-7"), tags()));
        let delta = b.add(Node::delta(vec![0xde, 0xad], tags()));
        let phi = b.add(Node::phi([omega, delta], tags()));
        let sigma = b.add(Node::sigma(EffectKind::Async, phi, tags()));
        let gamma = b.add(Node::gamma(ProofRef::new("z3:1"), sigma, tags()));
        let pi = b.add(Node::pi([gamma], tags()));
        let lambda = b.add(Node::lambda(
            vec![Param::new("n", Type::refined("int", ProofRef::new("refine:pos")))],
            pi,
            tags(),
        ));
        b.entry(lambda).record_step(b"encode-test");
        b.build().unwrap()
    }

    #[test]
    fn encode_decode_is_lossless() {
        let fragment = every_kind();
        let wire = WireFragment::encode(&fragment);
        let json = wire.to_json_pretty().unwrap();
        let back = WireFragment::from_json(&json).unwrap().decode().unwrap();
        assert_eq!(back, fragment);
        assert_eq!(back.semantic_hash(), fragment.semantic_hash());
    }

    #[test]
    fn eighth_kind_is_a_taxonomy_violation() {
        let mut wire = WireFragment::encode(&every_kind());
        let rogue = wire.nodes[3].id;
        wire.nodes[3].kind = 7;
        match wire.decode() {
            Err(DecodeError::Taxonomy(violation)) => {
                assert_eq!(violation.code, 7);
                assert_eq!(violation.node, Some(rogue));
            }
            other => panic!("expected taxonomy violation, got {:?}", other),
        }
    }

    #[test]
    fn taxonomy_violation_wins_over_other_issues() {
        let mut wire = WireFragment::encode(&every_kind());
        wire.nodes[0].tags = None;
        wire.nodes[1].kind = 200;
        assert!(matches!(wire.decode(), Err(DecodeError::Taxonomy(_))));
    }

    #[test]
    fn every_malformed_node_is_reported() {
        let mut wire = WireFragment::encode(&every_kind());
        wire.nodes[0].tags = None; // omega
        wire.nodes[1].trace = None; // delta
        wire.nodes[3].effect = Some("yield".into()); // sigma
        wire.nodes[4].inner = None; // gamma

        let Err(DecodeError::Malformed(issues)) = wire.decode() else {
            panic!("expected malformed");
        };
        assert_eq!(issues.len(), 4);
        assert!(matches!(issues[0], DecodeIssue::MissingTags { .. }));
        assert!(matches!(
            &issues[1],
            DecodeIssue::MissingField { kind: KindTag::Delta, field, .. } if field == "trace"
        ));
        assert!(matches!(&issues[2], DecodeIssue::UnknownEffect { effect, .. } if effect == "yield"));
        assert!(matches!(
            &issues[3],
            DecodeIssue::MissingField { kind: KindTag::Gamma, field, .. } if field == "inner"
        ));
    }

    #[test]
    fn partial_tags_fall_back_to_defaults() {
        let id = NodeId::new();
        let json = format!(
            r#"{{"entry":"{id}","nodes":[{{"id":"{id}","kind":6,"trace":[],
                "tags":{{"safety_lineage":"GC","concurrency_model":"SEQ"}}}}]}}"#
        );
        let fragment = WireFragment::from_json(&json).unwrap().decode().unwrap();
        let node = fragment.entry_node().unwrap();
        assert_eq!(node.tags().entropy_budget, 1024);
        assert_eq!(node.tags().properties, PropertySet::empty());
    }

    #[test]
    fn invalid_json_is_a_core_error() {
        assert!(matches!(WireFragment::from_json("{"), Err(CoreError::Json(_))));
    }
}
