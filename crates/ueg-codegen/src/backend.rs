//! The backend emitter interface.
//!
//! A backend declares its capabilities and provides one emitter per node
//! kind. The dispatcher owns ordering, gating and symbol assignment; an
//! emitter only turns one node into target source text, or declines with
//! [`Unsupported`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use ueg_core::{
    EffectKind, Fragment, Node, NodeId, ObligationId, Param, ProofRef,
};

use crate::capability::CapabilitySet;

/// An emitter declined a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("unsupported: {reason}")]
pub struct Unsupported {
    pub reason: String,
}

impl Unsupported {
    pub fn new(reason: impl Into<String>) -> Self {
        Unsupported { reason: reason.into() }
    }
}

/// Everything an emitter may consult besides the node itself.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    /// Symbol assigned to the node being emitted.
    pub symbol: &'a str,
    pub fragment: &'a Fragment,
    pub capabilities: &'a CapabilitySet,
    pub(crate) symbols: &'a HashMap<NodeId, String>,
}

impl<'a> EmitContext<'a> {
    /// The symbol of a referenced node.
    pub fn symbol_of(&self, id: NodeId) -> Result<&'a str, Unsupported> {
        self.symbols
            .get(&id)
            .map(String::as_str)
            .ok_or_else(|| Unsupported::new(format!("reference to unknown node {}", id)))
    }

    /// Symbols of several referenced nodes, in order.
    pub fn symbols_of(&self, ids: &[NodeId]) -> Result<Vec<&'a str>, Unsupported> {
        ids.iter().map(|id| self.symbol_of(*id)).collect()
    }
}

/// A target language emitter.
pub trait Backend: Send + Sync {
    /// Target identifier used to select the backend.
    fn name(&self) -> &str;

    fn capabilities(&self) -> &CapabilitySet;

    /// Text placed before the first emitted node.
    fn prelude(&self, _fragment: &Fragment) -> String {
        String::new()
    }

    fn emit_lambda(&self, cx: &EmitContext<'_>, node: &Node, params: &[Param], body: NodeId)
        -> Result<String, Unsupported>;

    fn emit_phi(&self, cx: &EmitContext<'_>, node: &Node, incoming: &[NodeId]) -> Result<String, Unsupported>;

    fn emit_sigma(&self, cx: &EmitContext<'_>, node: &Node, effect: EffectKind, inner: NodeId)
        -> Result<String, Unsupported>;

    fn emit_pi(&self, cx: &EmitContext<'_>, node: &Node, regions: &[NodeId]) -> Result<String, Unsupported>;

    fn emit_gamma(&self, cx: &EmitContext<'_>, node: &Node, proof: &ProofRef, inner: NodeId)
        -> Result<String, Unsupported>;

    fn emit_omega(&self, cx: &EmitContext<'_>, node: &Node, obligation: &ObligationId)
        -> Result<String, Unsupported>;

    fn emit_delta(&self, cx: &EmitContext<'_>, node: &Node, trace: &[u8]) -> Result<String, Unsupported>;
}
