//! The external verifier capability.
//!
//! The core never inspects proof content. For each `Gamma` proof reference
//! and `Omega` obligation it asks a [`Verifier`] and treats the verdict as
//! authoritative. Timeouts, retries and cancellation belong to whoever wraps
//! the real prover; a timeout should surface here as [`Verdict::Rejected`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::id::SemanticHash;

/// Outcome of one verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Rejected { reason: String },
}

impl Verdict {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Verdict::Rejected { reason: reason.into() }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Discharges proof references against a fragment hash.
///
/// Implementations must be callable from several threads at once; fragments
/// are validated independently and in parallel.
pub trait Verifier: Send + Sync {
    fn verify(&self, reference: &str, fragment_hash: &SemanticHash) -> Verdict;
}

impl<F> Verifier for F
where
    F: Fn(&str, &SemanticHash) -> Verdict + Send + Sync,
{
    fn verify(&self, reference: &str, fragment_hash: &SemanticHash) -> Verdict {
        self(reference, fragment_hash)
    }
}

/// A verifier backed by the list of references a prover already discharged.
///
/// Useful when proofs are checked out of band and only the results are
/// handed to the core, as the `ueg` CLI does.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DischargedSet {
    references: HashSet<String>,
}

impl DischargedSet {
    pub fn new() -> Self {
        DischargedSet::default()
    }

    pub fn discharge(&mut self, reference: impl Into<String>) {
        self.references.insert(reference.into());
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for DischargedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        DischargedSet {
            references: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl Verifier for DischargedSet {
    fn verify(&self, reference: &str, _fragment_hash: &SemanticHash) -> Verdict {
        if self.references.contains(reference) {
            Verdict::Accepted
        } else {
            Verdict::rejected(format!("'{}' has not been discharged", reference))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash() -> SemanticHash {
        SemanticHash([7; 32])
    }

    #[test]
    fn discharged_set_accepts_only_listed_references() {
        let set: DischargedSet = ["z3:lemma-1", "dafny:ob-2"].into_iter().collect();
        assert_eq!(set.verify("z3:lemma-1", &hash()), Verdict::Accepted);
        assert_eq!(
            set.verify("z3:lemma-9", &hash()),
            Verdict::rejected("'z3:lemma-9' has not been discharged")
        );
    }

    #[test]
    fn closures_are_verifiers() {
        let strict = |reference: &str, _: &SemanticHash| {
            if reference.starts_with("z3:") {
                Verdict::Accepted
            } else {
                Verdict::rejected("unsupported prover")
            }
        };
        assert!(strict.verify("z3:x", &hash()).is_accepted());
        assert!(!strict.verify("coq:x", &hash()).is_accepted());
    }

    #[test]
    fn verdict_serializes_with_tag() {
        let json = serde_json::to_string(&Verdict::rejected("timeout")).unwrap();
        assert_eq!(json, r#"{"verdict":"rejected","reason":"timeout"}"#);
    }
}
