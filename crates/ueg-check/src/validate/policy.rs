//! Data-driven table of forbidden tag combinations.
//!
//! Each [`ForbiddenCombination`] is a conjunction over one node's tags: every
//! listed property present, every `absent` property missing, and optionally a
//! specific concurrency model and/or safety lineage. A node matching any rule
//! invalidates its fragment. The table serializes to JSON so deployments can
//! audit and extend it without code changes.

use serde::{Deserialize, Serialize};

use ueg_core::{ConcurrencyModel, Property, PropertySet, SafetyLineage, Tags};

/// One forbidden combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenCombination {
    /// Stable rule name reported in violations.
    pub name: String,
    /// Why the combination cannot be lowered safely.
    pub reason: String,
    /// Properties that must all be present for the rule to match.
    #[serde(default)]
    pub properties: PropertySet,
    /// Properties that must all be absent for the rule to match.
    #[serde(default)]
    pub absent: PropertySet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<ConcurrencyModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety: Option<SafetyLineage>,
}

impl ForbiddenCombination {
    pub fn matches(&self, tags: &Tags) -> bool {
        tags.properties.is_superset(&self.properties)
            && tags.properties.is_disjoint(&self.absent)
            && self.concurrency.map_or(true, |c| c == tags.concurrency_model)
            && self.safety.map_or(true, |s| s == tags.safety_lineage)
    }
}

/// The policy table consulted by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyTable {
    rules: Vec<ForbiddenCombination>,
}

impl PolicyTable {
    /// A table that forbids nothing.
    pub fn empty() -> Self {
        PolicyTable { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: ForbiddenCombination) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[ForbiddenCombination] {
        &self.rules
    }

    /// Rules matched by `tags`, in table order.
    pub fn matching<'a>(&'a self, tags: &'a Tags) -> impl Iterator<Item = &'a ForbiddenCombination> + 'a {
        self.rules.iter().filter(move |rule| rule.matches(tags))
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        PolicyTable::empty()
            .with_rule(ForbiddenCombination {
                name: "constant-time-on-gpu".into(),
                reason: "GPU scheduling cannot guarantee timing independence".into(),
                properties: [Property::ConstantTime].into(),
                absent: PropertySet::empty(),
                concurrency: Some(ConcurrencyModel::Gpu),
                safety: None,
            })
            .with_rule(ForbiddenCombination {
                name: "tco-without-termination".into(),
                reason: "unbounded tail recursion without a termination guarantee cannot be lowered safely"
                    .into(),
                properties: [Property::TcoRequired].into(),
                absent: [Property::Terminating].into(),
                concurrency: None,
                safety: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(concurrency: ConcurrencyModel, props: impl Into<PropertySet>) -> Tags {
        Tags::new(SafetyLineage::Owned, concurrency, props)
    }

    #[test]
    fn constant_time_on_gpu_is_forbidden() {
        let table = PolicyTable::default();
        let gpu_ct = tags(ConcurrencyModel::Gpu, [Property::ConstantTime]);
        let hit: Vec<_> = table
            .matching(&gpu_ct)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(hit, vec!["constant-time-on-gpu"]);
        assert_eq!(table.matching(&tags(ConcurrencyModel::Threads, [Property::ConstantTime])).count(), 0);
        assert_eq!(table.matching(&tags(ConcurrencyModel::Gpu, PropertySet::empty())).count(), 0);
    }

    #[test]
    fn tco_requires_termination() {
        let table = PolicyTable::default();
        assert_eq!(table.matching(&tags(ConcurrencyModel::Seq, [Property::TcoRequired])).count(), 1);
        assert_eq!(
            table
                .matching(&tags(ConcurrencyModel::Seq, [Property::TcoRequired, Property::Terminating]))
                .count(),
            0
        );
    }

    #[test]
    fn both_rules_can_fire_on_one_node() {
        let table = PolicyTable::default();
        let t = tags(ConcurrencyModel::Gpu, [Property::ConstantTime, Property::TcoRequired]);
        assert_eq!(table.matching(&t).count(), 2);
    }

    #[test]
    fn table_loads_from_json() {
        let json = r#"[{"name":"no-raw-threads","reason":"raw memory shared across threads",
                        "concurrency":"THREADS","safety":"RAW"}]"#;
        let table: PolicyTable = serde_json::from_str(json).unwrap();
        let raw_threads = Tags::new(SafetyLineage::Raw, ConcurrencyModel::Threads, PropertySet::empty());
        let owned_threads = Tags::new(SafetyLineage::Owned, ConcurrencyModel::Threads, PropertySet::empty());
        assert_eq!(table.matching(&raw_threads).count(), 1);
        assert_eq!(table.matching(&owned_threads).count(), 0);
    }

    #[test]
    fn default_table_round_trips_through_json() {
        let json = serde_json::to_string(&PolicyTable::default()).unwrap();
        let back: PolicyTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PolicyTable::default());
    }
}
