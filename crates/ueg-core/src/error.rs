//! Core error types for ueg-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of the core data model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::NodeId;

/// Core errors produced while assembling graph values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A fragment was assembled without designating an entry node.
    #[error("fragment has no entry node")]
    NoEntry,

    /// A wire fragment could not be parsed as JSON.
    #[error("wire decoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A node-kind value outside the closed seven-kind taxonomy.
///
/// Always a defect in whoever produced the value; consumers never skip it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("taxonomy violation: kind code {code} is not one of the seven node kinds{}", node_suffix(.node))]
pub struct TaxonomyViolation {
    /// The offending wire code.
    pub code: u8,
    /// The node carrying it, when known.
    pub node: Option<NodeId>,
}

fn node_suffix(node: &Option<NodeId>) -> String {
    match node {
        Some(id) => format!(" (node {})", id),
        None => String::new(),
    }
}

/// Failure reported by an external hash registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("hash registry unavailable: {reason}")]
pub struct RegistryError {
    pub reason: String,
}
