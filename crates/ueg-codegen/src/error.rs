//! Lowering error types.

use ueg_check::ValidationReport;
use ueg_core::TaxonomyViolation;

use crate::dispatch::NodeFailure;

/// Errors that stop a lowering as a whole.
///
/// Per-node failures are not errors; they are reported in
/// [`Lowering::failures`](crate::Lowering::failures) unless the caller asked
/// for full coverage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LowerError {
    /// No backend registered under the requested target name.
    #[error("unknown backend '{target}' (available: {})", .available.join(", "))]
    UnknownBackend {
        target: String,
        available: Vec<String>,
    },

    /// Full coverage was required but some nodes did not lower.
    #[error("{backend} could not lower {} node(s)", .failures.len())]
    Incomplete {
        backend: String,
        failures: Vec<NodeFailure>,
    },

    /// The fragment failed validation before lowering.
    #[error("fragment rejected with {} violation(s)", .0.violations.len())]
    Rejected(ValidationReport),

    /// A kind outside the seven-kind taxonomy reached dispatch.
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyViolation),
}
