//! All-or-nothing fragment validation.
//!
//! [`Validator::validate`] runs every rule over a fragment and either returns
//! a [`ValidatedFragment`] or rejects the whole fragment with a report that
//! lists every failing rule. There is no partial acceptance and no fail-fast:
//!
//! - structure: entry present, unique identities, no dangling references,
//!   provenance root shape
//! - tags: forbidden combinations from the [`PolicyTable`], exhausted
//!   entropy budgets
//! - entropy certificate: present, decodable, ratio within budget
//! - proofs: Gamma/Omega references well-formed and accepted by the external
//!   [`Verifier`]; Lambda refinement references well-formed
//! - optionally, a [`HashRegistry`] lookup of the fragment's semantic hash
//!
//! Fragments from an untrusted boundary go through
//! [`Validator::validate_wire`], which additionally reports nodes without
//! tags or with undecodable payloads and fails fatally on kind codes outside
//! the taxonomy.

pub mod diagnostics;
pub mod policy;

pub use diagnostics::{Notice, ValidationReport, Violation};
pub use policy::{ForbiddenCombination, PolicyTable};

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use ueg_core::{
    DecodeIssue, Fragment, HashRegistry, Lookup, Node, NodeId, NodeKind, SemanticHash, TaxonomyViolation,
    Verdict, Verifier, WireFragment,
};

use crate::gate::DEFAULT_OBFUSCATION_THRESHOLD;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How a registry hit is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Report a [`Notice::KnownHash`]; the fragment may still pass.
    #[default]
    Report,
    /// Treat a known hash as a [`Violation::DuplicateHash`].
    Reject,
}

/// Validator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub policy: PolicyTable,
    /// Highest certified entropy ratio accepted.
    pub obfuscation_budget: f64,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            policy: PolicyTable::default(),
            obfuscation_budget: DEFAULT_OBFUSCATION_THRESHOLD,
            duplicate_policy: DuplicatePolicy::Report,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Why validation refused a fragment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// One or more rules failed; the report lists all of them.
    #[error("fragment rejected with {} violation(s)", .0.violations.len())]
    Rejected(ValidationReport),

    /// A kind code outside the seven-kind taxonomy. A producer defect.
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyViolation),
}

impl ValidationError {
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            ValidationError::Rejected(report) => Some(report),
            ValidationError::Taxonomy(_) => None,
        }
    }
}

/// A fragment that passed every rule.
///
/// Only the validator constructs these; lowering accepts nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFragment {
    fragment: Fragment,
    hash: SemanticHash,
    notices: Vec<Notice>,
}

impl ValidatedFragment {
    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    pub fn semantic_hash(&self) -> SemanticHash {
        self.hash
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn into_fragment(self) -> Fragment {
        self.fragment
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// The fragment validator. Stateless between calls and shareable across
/// threads.
#[derive(Clone)]
pub struct Validator {
    config: ValidatorConfig,
    verifier: Arc<dyn Verifier>,
    registry: Option<Arc<dyn HashRegistry>>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .field("registry", &self.registry.is_some())
            .finish()
    }
}

impl Validator {
    pub fn new(config: ValidatorConfig, verifier: Arc<dyn Verifier>) -> Self {
        Validator {
            config,
            verifier,
            registry: None,
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn HashRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Runs every rule and returns the full report without deciding.
    pub fn inspect(&self, fragment: &Fragment) -> ValidationReport {
        self.inspect_with(fragment, &HashSet::new())
    }

    /// Accepts or rejects `fragment` as a whole.
    pub fn validate(&self, fragment: Fragment) -> Result<ValidatedFragment, ValidationError> {
        let report = self.inspect(&fragment);
        self.decide(fragment, report)
    }

    /// Decodes and validates a fragment from the untrusted boundary.
    ///
    /// Nodes that fail to decode are reported alongside every other rule;
    /// references to them are not reported again as dangling.
    pub fn validate_wire(&self, wire: &WireFragment) -> Result<ValidatedFragment, ValidationError> {
        wire.check_taxonomy()?;

        let mut decoded = Vec::with_capacity(wire.nodes.len());
        let mut issues = Vec::new();
        let mut undecoded = HashSet::new();
        for node in &wire.nodes {
            match node.decode() {
                Ok(node) => decoded.push(node),
                Err(mut node_issues) => {
                    undecoded.insert(node.id);
                    issues.append(&mut node_issues);
                }
            }
        }

        let fragment = Fragment::new(
            decoded,
            wire.entry,
            ueg_core::Provenance(wire.provenance.clone()),
            wire.proof.clone(),
            ueg_core::EntropyCertificate(wire.entropy_certificate.clone()),
        );

        let mut report = self.inspect_with(&fragment, &undecoded);
        if !issues.is_empty() {
            let mut violations: Vec<Violation> = issues.into_iter().map(issue_violation).collect();
            violations.append(&mut report.violations);
            report.violations = violations;
        }
        self.decide(fragment, report)
    }

    fn decide(&self, fragment: Fragment, report: ValidationReport) -> Result<ValidatedFragment, ValidationError> {
        if !report.is_clean() {
            warn!(
                hash = %report.fragment_hash,
                violations = report.violations.len(),
                "fragment rejected"
            );
            return Err(ValidationError::Rejected(report));
        }
        info!(hash = %report.fragment_hash, nodes = fragment.len(), "fragment accepted");
        Ok(ValidatedFragment {
            fragment,
            hash: report.fragment_hash,
            notices: report.notices,
        })
    }

    fn inspect_with(&self, fragment: &Fragment, undecoded: &HashSet<NodeId>) -> ValidationReport {
        let fragment_hash = fragment.semantic_hash();
        let mut violations = Vec::new();
        let mut notices = Vec::new();

        self.check_structure(fragment, undecoded, &mut violations);
        for node in fragment.nodes() {
            self.check_node(node, &fragment_hash, &mut violations);
        }
        self.check_certificate(fragment, &mut violations);
        self.check_registry(&fragment_hash, &mut violations, &mut notices);

        ValidationReport {
            fragment_hash,
            violations,
            notices,
        }
    }

    fn check_structure(&self, fragment: &Fragment, undecoded: &HashSet<NodeId>, out: &mut Vec<Violation>) {
        if !fragment.contains(fragment.entry()) && !undecoded.contains(&fragment.entry()) {
            out.push(Violation::MissingEntry {
                entry: fragment.entry(),
            });
        }
        for node in fragment.duplicate_ids() {
            out.push(Violation::DuplicateNode { node });
        }
        for (node, target) in fragment.dangling_references() {
            if !undecoded.contains(&target) {
                out.push(Violation::DanglingReference { node, target });
            }
        }
        if !fragment.provenance().is_well_formed() {
            out.push(Violation::MalformedProvenance {
                len: fragment.provenance().as_bytes().len(),
            });
        }
    }

    fn check_node(&self, node: &Node, fragment_hash: &SemanticHash, out: &mut Vec<Violation>) {
        let id = node.id();
        let tags = node.tags();

        for rule in self.config.policy.matching(tags) {
            debug!(node = %id, policy = %rule.name, "forbidden tag combination");
            out.push(Violation::ForbiddenCombination {
                node: id,
                policy: rule.name.clone(),
                reason: rule.reason.clone(),
            });
        }

        if tags.entropy_budget == 0 {
            out.push(Violation::EntropyBudgetExhausted { node: id });
        }

        match node.kind() {
            NodeKind::Gamma { proof, .. } => {
                self.check_proof(node, proof.as_str(), proof.is_well_formed(), fragment_hash, out)
            }
            NodeKind::Omega { obligation } => self.check_proof(
                node,
                obligation.as_str(),
                obligation.is_well_formed(),
                fragment_hash,
                out,
            ),
            NodeKind::Lambda { params, .. } => {
                for param in params {
                    if !param.is_well_formed() {
                        out.push(Violation::MalformedParameter {
                            node: id,
                            param: param.name.clone(),
                            annotation: param.ty.name.clone(),
                        });
                    }
                    if let Some(refinement) = &param.ty.refinement {
                        if !refinement.is_well_formed() {
                            out.push(Violation::MalformedRefinement {
                                node: id,
                                param: param.name.clone(),
                                reference: refinement.0.clone(),
                            });
                        }
                    }
                }
            }
            NodeKind::Phi { .. } | NodeKind::Sigma { .. } | NodeKind::Pi { .. } | NodeKind::Delta { .. } => {}
        }
    }

    fn check_proof(
        &self,
        node: &Node,
        reference: &str,
        well_formed: bool,
        fragment_hash: &SemanticHash,
        out: &mut Vec<Violation>,
    ) {
        if !well_formed {
            out.push(Violation::MalformedProofReference {
                node: node.id(),
                kind: node.kind_tag(),
                reference: reference.to_string(),
            });
            return;
        }
        match self.verifier.verify(reference, fragment_hash) {
            Verdict::Accepted => debug!(node = %node.id(), reference, "proof accepted"),
            Verdict::Rejected { reason } => out.push(Violation::VerificationFailed {
                node: node.id(),
                reference: reference.to_string(),
                reason,
            }),
        }
    }

    fn check_certificate(&self, fragment: &Fragment, out: &mut Vec<Violation>) {
        let certificate = fragment.entropy_certificate();
        if !certificate.is_present() {
            out.push(Violation::MissingCertificate);
            return;
        }
        match certificate.claim() {
            None => out.push(Violation::MalformedCertificate),
            Some(claim) if claim.ratio > self.config.obfuscation_budget => {
                out.push(Violation::ObfuscationBudgetExceeded {
                    ratio: claim.ratio,
                    budget: self.config.obfuscation_budget,
                    language: claim.language,
                })
            }
            Some(_) => {}
        }
    }

    fn check_registry(&self, hash: &SemanticHash, violations: &mut Vec<Violation>, notices: &mut Vec<Notice>) {
        let Some(registry) = &self.registry else {
            return;
        };
        match registry.lookup(hash) {
            Ok(Lookup::Unseen) => {}
            Ok(Lookup::Seen(metadata)) => match self.config.duplicate_policy {
                DuplicatePolicy::Report => notices.push(Notice::KnownHash { hash: *hash, metadata }),
                DuplicatePolicy::Reject => violations.push(Violation::DuplicateHash { hash: *hash, metadata }),
            },
            Err(err) => violations.push(Violation::RegistryUnavailable { reason: err.reason }),
        }
    }
}

fn issue_violation(issue: DecodeIssue) -> Violation {
    match issue {
        DecodeIssue::MissingTags { node } => Violation::MissingTags { node },
        other => Violation::MalformedNode {
            node: other.node(),
            detail: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ueg_core::{
        ConcurrencyModel, DischargedSet, EntropyCertificate, FragmentBuilder, ObligationId, Param,
        ProofRef, Property, PropertySet, SafetyLineage, Tags, Type,
    };

    fn tags() -> Tags {
        Tags::new(SafetyLineage::Owned, ConcurrencyModel::Seq, [Property::Terminating])
    }

    fn validator() -> Validator {
        let discharged: DischargedSet = ["z3:ok", "ob-1"].into_iter().collect();
        Validator::new(ValidatorConfig::default(), Arc::new(discharged))
    }

    fn certified(builder: &mut FragmentBuilder) -> &mut FragmentBuilder {
        builder
            .record_step(b"front-end")
            .entropy_certificate(EntropyCertificate::attest(0.8, "rust"))
    }

    #[test]
    fn clean_fragment_is_accepted() {
        let mut b = FragmentBuilder::new();
        let omega = b.add(Node::omega(ObligationId::new("ob-1"), tags()));
        let gamma = b.add(Node::gamma(ProofRef::new("z3:ok"), omega, tags()));
        let lambda = b.add(Node::lambda(vec![Param::new("x", Type::named("int"))], gamma, tags()));
        certified(b.entry(lambda));
        let fragment = b.build().unwrap();
        let hash = fragment.semantic_hash();

        let validated = validator().validate(fragment).unwrap();
        assert_eq!(validated.semantic_hash(), hash);
        assert!(validated.notices().is_empty());
    }

    #[test]
    fn missing_certificate_and_provenance_are_reported() {
        let mut b = FragmentBuilder::new();
        let delta = b.add(Node::delta(Vec::new(), tags()));
        b.entry(delta);
        let built = b.build().unwrap();
        let fragment = Fragment::new(
            built.nodes().to_vec(),
            delta,
            ueg_core::Provenance(b"short".to_vec()),
            Vec::new(),
            EntropyCertificate::default(),
        );
        let report = validator().inspect(&fragment);
        assert_eq!(
            report.violations,
            vec![Violation::MalformedProvenance { len: 5 }, Violation::MissingCertificate]
        );
    }

    #[test]
    fn foreign_certificate_is_malformed() {
        let mut b = FragmentBuilder::new();
        let delta = b.add(Node::delta(Vec::new(), tags()));
        b.entry(delta)
            .record_step(b"x")
            .entropy_certificate(EntropyCertificate(b"entropy-ok".to_vec()));
        let report = validator().inspect(&b.build().unwrap());
        assert_eq!(report.violations, vec![Violation::MalformedCertificate]);
    }

    #[test]
    fn certified_ratio_over_budget_is_rejected() {
        let mut b = FragmentBuilder::new();
        let delta = b.add(Node::delta(Vec::new(), tags()));
        b.entry(delta)
            .record_step(b"x")
            .entropy_certificate(EntropyCertificate::attest(1.2, "cobol"));
        let report = validator().inspect(&b.build().unwrap());
        assert_eq!(
            report.violations,
            vec![Violation::ObfuscationBudgetExceeded {
                ratio: 1.2,
                budget: 1.05,
                language: "cobol".into()
            }]
        );
    }

    #[test]
    fn malformed_references_skip_the_verifier() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let verifier = move |_: &str, _: &SemanticHash| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Verdict::Accepted
        };
        let validator = Validator::new(ValidatorConfig::default(), Arc::new(verifier));

        let mut b = FragmentBuilder::new();
        let omega = b.add(Node::omega(ObligationId::new(""), tags()));
        let gamma = b.add(Node::gamma(ProofRef::new("z3 lemma"), omega, tags()));
        let lambda = b.add(Node::lambda(
            vec![Param::new("n", Type::refined("int", ProofRef::new("bad ref!")))],
            gamma,
            tags(),
        ));
        certified(b.entry(lambda));

        let report = validator.inspect(&b.build().unwrap());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(report.violations.len(), 3);
        assert!(matches!(report.violations[2], Violation::MalformedRefinement { .. }));
    }

    #[test]
    fn parameters_that_would_inject_code_are_rejected() {
        let mut b = FragmentBuilder::new();
        let delta = b.add(Node::delta(Vec::new(), tags()));
        let escape = "x: i32) {} pub fn pwned() { std::process::exit(1) } fn y(z";
        let lambda = b.add(Node::lambda(
            vec![
                Param::new(escape, Type::named("int")),
                Param::new("ok", Type::named("int) {} fn evil() {")),
                Param::new("fine", Type::named("List[int]")),
            ],
            delta,
            tags(),
        ));
        certified(b.entry(lambda));

        let report = validator().inspect(&b.build().unwrap());
        assert_eq!(
            report.violations,
            vec![
                Violation::MalformedParameter {
                    node: lambda,
                    param: escape.into(),
                    annotation: "int".into(),
                },
                Violation::MalformedParameter {
                    node: lambda,
                    param: "ok".into(),
                    annotation: "int) {} fn evil() {".into(),
                },
            ]
        );
    }

    #[test]
    fn exhausted_budget_is_a_violation() {
        let mut b = FragmentBuilder::new();
        let delta = b.add(Node::delta(Vec::new(), tags().debit_entropy(u32::MAX)));
        certified(b.entry(delta));
        let report = validator().inspect(&b.build().unwrap());
        assert_eq!(report.violations, vec![Violation::EntropyBudgetExhausted { node: delta }]);
    }

    #[test]
    fn empty_policy_table_allows_everything() {
        let config = ValidatorConfig {
            policy: PolicyTable::empty(),
            ..ValidatorConfig::default()
        };
        let validator = Validator::new(config, Arc::new(DischargedSet::new()));
        let mut b = FragmentBuilder::new();
        let node = b.add(Node::delta(
            Vec::new(),
            Tags::new(SafetyLineage::Raw, ConcurrencyModel::Gpu, PropertySet::all()),
        ));
        certified(b.entry(node));
        assert!(validator.validate(b.build().unwrap()).is_ok());
    }

    #[test]
    fn config_deserializes_partially() {
        let config: ValidatorConfig = serde_json::from_str(r#"{"duplicate_policy":"reject"}"#).unwrap();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.policy, PolicyTable::default());
        assert_eq!(config.obfuscation_budget, 1.05);
    }
}
