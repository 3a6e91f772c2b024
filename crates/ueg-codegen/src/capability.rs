//! Backend capabilities and the tag-derived gating table.
//!
//! A backend declares what its target can guarantee. Before a node is
//! emitted, the [`GatingPolicy`] derives the capabilities the node's tags and
//! kind demand; a node whose demands the backend cannot meet fails on its own
//! without affecting sibling nodes.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use ueg_core::{KindTag, Node, NodeId, Property};

/// A guarantee a backend's target can preserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    PreservesConstantTime,
    CheckedOverflow,
    ProofCarryingCodegen,
}

impl Capability {
    pub fn name(self) -> &'static str {
        match self {
            Capability::PreservesConstantTime => "preserves-constant-time",
            Capability::CheckedOverflow => "checked-overflow",
            Capability::ProofCarryingCodegen => "proof-carrying-codegen",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The capabilities a backend declares.
pub type CapabilitySet = BTreeSet<Capability>;

/// What about a node demanded a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger", content = "value", rename_all = "snake_case")]
pub enum Trigger {
    Property(Property),
    Kind(KindTag),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Property(p) => write!(f, "property {}", p),
            Trigger::Kind(k) => write!(f, "kind {}", k),
        }
    }
}

/// One row of the gating table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRule {
    pub trigger: Trigger,
    pub requires: Capability,
}

/// A constraint that was checked and held while lowering one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcedConstraint {
    pub node: NodeId,
    pub trigger: Trigger,
    pub capability: Capability,
}

/// Data-driven table mapping tags and kinds to required capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatingPolicy {
    rules: Vec<GateRule>,
}

impl Default for GatingPolicy {
    fn default() -> Self {
        GatingPolicy::empty()
            .with_rule(Trigger::Property(Property::ConstantTime), Capability::PreservesConstantTime)
            .with_rule(Trigger::Property(Property::NoOverflow), Capability::CheckedOverflow)
            .with_rule(Trigger::Kind(KindTag::Gamma), Capability::ProofCarryingCodegen)
            .with_rule(Trigger::Kind(KindTag::Omega), Capability::ProofCarryingCodegen)
    }
}

impl GatingPolicy {
    pub fn empty() -> Self {
        GatingPolicy { rules: Vec::new() }
    }

    pub fn with_rule(mut self, trigger: Trigger, requires: Capability) -> Self {
        self.rules.push(GateRule { trigger, requires });
        self
    }

    pub fn rules(&self) -> &[GateRule] {
        &self.rules
    }

    /// Rules that apply to `node`, in table order.
    pub fn requirements<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a GateRule> + 'a {
        self.rules.iter().filter(move |rule| match rule.trigger {
            Trigger::Property(p) => node.tags().has(p),
            Trigger::Kind(k) => node.kind_tag() == k,
        })
    }

    /// Checks `node` against `capabilities`.
    ///
    /// Returns the constraints enforced, or the first rule the backend
    /// cannot satisfy.
    pub fn check(&self, node: &Node, capabilities: &CapabilitySet) -> Result<Vec<EnforcedConstraint>, GateRule> {
        self.requirements(node)
            .map(|rule| {
                if capabilities.contains(&rule.requires) {
                    Ok(EnforcedConstraint {
                        node: node.id(),
                        trigger: rule.trigger,
                        capability: rule.requires,
                    })
                } else {
                    Err(*rule)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ueg_core::{ConcurrencyModel, ObligationId, PropertySet, SafetyLineage, Tags};

    fn tags(props: impl Into<PropertySet>) -> Tags {
        Tags::new(SafetyLineage::Owned, ConcurrencyModel::Seq, props)
    }

    #[test]
    fn constant_time_needs_capability() {
        let node = Node::delta(Vec::new(), tags([Property::ConstantTime]));
        let policy = GatingPolicy::default();
        let denied = policy.check(&node, &CapabilitySet::new()).unwrap_err();
        assert_eq!(denied.requires, Capability::PreservesConstantTime);

        let caps: CapabilitySet = [Capability::PreservesConstantTime].into();
        let enforced = policy.check(&node, &caps).unwrap();
        assert_eq!(enforced.len(), 1);
        assert_eq!(enforced[0].trigger, Trigger::Property(Property::ConstantTime));
    }

    #[test]
    fn omega_needs_proof_carrying_codegen() {
        let node = Node::omega(ObligationId::new("ob"), tags([Property::NoOverflow]));
        let caps: CapabilitySet = [Capability::CheckedOverflow, Capability::ProofCarryingCodegen].into();
        let enforced = GatingPolicy::default().check(&node, &caps).unwrap();
        let triggers: Vec<Trigger> = enforced.iter().map(|c| c.trigger).collect();
        assert_eq!(
            triggers,
            vec![Trigger::Property(Property::NoOverflow), Trigger::Kind(KindTag::Omega)]
        );
    }

    #[test]
    fn untagged_properties_demand_nothing() {
        let node = Node::delta(Vec::new(), tags([Property::Terminating, Property::DeterministicFp]));
        assert_eq!(GatingPolicy::default().check(&node, &CapabilitySet::new()).unwrap(), vec![]);
    }

    #[test]
    fn policy_serializes_as_table() {
        let json = serde_json::to_string(&GatingPolicy::default()).unwrap();
        assert!(json.contains(r#"{"trigger":{"trigger":"property","value":"CONSTANT_TIME"},"requires":"preserves-constant-time"}"#));
        let back: GatingPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GatingPolicy::default());
    }
}
