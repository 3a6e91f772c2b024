//! The tag model carried by every node.
//!
//! Tags are four independent axes: memory/ownership provenance
//! ([`SafetyLineage`]), concurrency discipline ([`ConcurrencyModel`]), a set
//! of guaranteed [`Property`] values, and an entropy budget. Every axis has a
//! stable numeric code used for canonical hashing; the codes never change
//! once published.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Entropy budget assigned to freshly constructed tags.
pub const DEFAULT_ENTROPY_BUDGET: u32 = 1024;

/// Provenance of the memory/ownership discipline a node was written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyLineage {
    Raw,
    Gc,
    Borrowed,
    Owned,
}

impl SafetyLineage {
    pub const ALL: [SafetyLineage; 4] = [
        SafetyLineage::Raw,
        SafetyLineage::Gc,
        SafetyLineage::Borrowed,
        SafetyLineage::Owned,
    ];

    /// Stable hashing code.
    pub fn code(self) -> u8 {
        match self {
            SafetyLineage::Raw => 0b0000,
            SafetyLineage::Gc => 0b0001,
            SafetyLineage::Borrowed => 0b0010,
            SafetyLineage::Owned => 0b0011,
        }
    }
}

/// Concurrency discipline a node executes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConcurrencyModel {
    Seq,
    Threads,
    Actors,
    Stm,
    Crdt,
    Gpu,
}

impl ConcurrencyModel {
    pub const ALL: [ConcurrencyModel; 6] = [
        ConcurrencyModel::Seq,
        ConcurrencyModel::Threads,
        ConcurrencyModel::Actors,
        ConcurrencyModel::Stm,
        ConcurrencyModel::Crdt,
        ConcurrencyModel::Gpu,
    ];

    /// Stable hashing code. GPU sits apart from the CPU models.
    pub fn code(self) -> u8 {
        match self {
            ConcurrencyModel::Seq => 0b0000,
            ConcurrencyModel::Threads => 0b0001,
            ConcurrencyModel::Actors => 0b0010,
            ConcurrencyModel::Stm => 0b0011,
            ConcurrencyModel::Crdt => 0b0100,
            ConcurrencyModel::Gpu => 0b1111,
        }
    }
}

/// A guarantee a node carries into lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Property {
    ConstantTime,
    TcoRequired,
    Terminating,
    NoOverflow,
    DeterministicFp,
}

impl Property {
    pub const ALL: [Property; 5] = [
        Property::ConstantTime,
        Property::TcoRequired,
        Property::Terminating,
        Property::NoOverflow,
        Property::DeterministicFp,
    ];

    /// Stable hashing code (one bit per property).
    pub fn code(self) -> u8 {
        match self {
            Property::ConstantTime => 1 << 0,
            Property::TcoRequired => 1 << 1,
            Property::Terminating => 1 << 2,
            Property::NoOverflow => 1 << 3,
            Property::DeterministicFp => 1 << 4,
        }
    }

    /// Upper-case name as used in diagnostics and policy tables.
    pub fn name(self) -> &'static str {
        match self {
            Property::ConstantTime => "CONSTANT_TIME",
            Property::TcoRequired => "TCO_REQUIRED",
            Property::Terminating => "TERMINATING",
            Property::NoOverflow => "NO_OVERFLOW",
            Property::DeterministicFp => "DETERMINISTIC_FP",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Any subset of [`Property`], including empty and all.
///
/// Backed by an ordered set so iteration (and therefore hashing) is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet(BTreeSet<Property>);

impl PropertySet {
    pub fn empty() -> Self {
        PropertySet(BTreeSet::new())
    }

    pub fn all() -> Self {
        Property::ALL.into_iter().collect()
    }

    /// Returns a copy of this set with `property` added.
    pub fn with(mut self, property: Property) -> Self {
        self.0.insert(property);
        self
    }

    pub fn insert(&mut self, property: Property) -> bool {
        self.0.insert(property)
    }

    pub fn contains(&self, property: Property) -> bool {
        self.0.contains(&property)
    }

    /// True when every property of `other` is also in `self`.
    pub fn is_superset(&self, other: &PropertySet) -> bool {
        self.0.is_superset(&other.0)
    }

    /// True when `self` and `other` share no property.
    pub fn is_disjoint(&self, other: &PropertySet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates in stable code order.
    pub fn iter(&self) -> impl Iterator<Item = Property> + '_ {
        self.0.iter().copied()
    }

    /// Folds the set into its bit representation (hashing only).
    pub fn bits(&self) -> u8 {
        self.iter().fold(0, |acc, p| acc | p.code())
    }
}

impl FromIterator<Property> for PropertySet {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        PropertySet(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Property; N]> for PropertySet {
    fn from(props: [Property; N]) -> Self {
        props.into_iter().collect()
    }
}

/// The mandatory tag value attached to every node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tags {
    pub safety_lineage: SafetyLineage,
    pub concurrency_model: ConcurrencyModel,
    #[serde(default)]
    pub properties: PropertySet,
    #[serde(default = "default_entropy_budget")]
    pub entropy_budget: u32,
}

fn default_entropy_budget() -> u32 {
    DEFAULT_ENTROPY_BUDGET
}

impl Tags {
    /// Creates tags with the default entropy budget.
    pub fn new(
        safety_lineage: SafetyLineage,
        concurrency_model: ConcurrencyModel,
        properties: impl Into<PropertySet>,
    ) -> Self {
        Tags {
            safety_lineage,
            concurrency_model,
            properties: properties.into(),
            entropy_budget: DEFAULT_ENTROPY_BUDGET,
        }
    }

    pub fn with_entropy_budget(mut self, budget: u32) -> Self {
        self.entropy_budget = budget;
        self
    }

    /// Returns tags whose budget is reduced by `amount`, saturating at zero.
    ///
    /// Called by front-ends whenever an obfuscation-adjacent signal is seen on
    /// the owning fragment; tags themselves are never mutated in place.
    pub fn debit_entropy(&self, amount: u32) -> Tags {
        Tags {
            entropy_budget: self.entropy_budget.saturating_sub(amount),
            ..self.clone()
        }
    }

    pub fn has(&self, property: Property) -> bool {
        self.properties.contains(property)
    }

    /// Canonical byte encoding: lineage, concurrency, property bits, budget.
    pub fn canonical_bytes(&self) -> [u8; 7] {
        let budget = self.entropy_budget.to_le_bytes();
        [
            self.safety_lineage.code(),
            self.concurrency_model.code(),
            self.properties.bits(),
            budget[0],
            budget[1],
            budget[2],
            budget[3],
        ]
    }
}
