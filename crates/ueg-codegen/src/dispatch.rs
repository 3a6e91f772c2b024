//! The lowering dispatcher.
//!
//! For each node of a validated fragment, in entry-first structural order:
//!
//! 1. check the node against the [`GatingPolicy`] using the backend's
//!    declared capabilities,
//! 2. dispatch exhaustively on the node kind to the backend's emitter,
//! 3. record either the emitted text or a per-node [`NodeFailure`].
//!
//! A failing node never aborts its siblings. Callers that need every node
//! lowered use [`Dispatcher::lower_complete`], which turns any failure into
//! [`LowerError::Incomplete`].

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ueg_check::ValidatedFragment;
use ueg_core::{KindTag, Node, NodeId, NodeKind, SemanticHash};

use crate::backend::{Backend, EmitContext, Unsupported};
use crate::backends;
use crate::capability::{Capability, EnforcedConstraint, GatingPolicy, Trigger};
use crate::error::LowerError;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Why one node did not lower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum FailureCause {
    /// A tag or kind demands a capability the backend lacks.
    MissingCapability {
        capability: Capability,
        trigger: Trigger,
    },
    /// The emitter declined the node.
    Unsupported { reason: String },
}

/// A node that did not lower on one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub node: NodeId,
    pub kind: KindTag,
    pub symbol: String,
    pub cause: FailureCause,
}

impl std::fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            FailureCause::MissingCapability { capability, trigger } => write!(
                f,
                "{} ({} {}): {} requires '{}'",
                self.symbol, self.kind, self.node, trigger, capability
            ),
            FailureCause::Unsupported { reason } => {
                write!(f, "{} ({} {}): {}", self.symbol, self.kind, self.node, reason)
            }
        }
    }
}

/// Source text emitted for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedNode {
    pub node: NodeId,
    pub symbol: String,
    pub source: String,
}

/// Result of lowering one fragment on one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lowering {
    pub backend: String,
    pub fragment_hash: SemanticHash,
    pub prelude: String,
    /// Emitted nodes in entry-first structural order.
    pub emitted: Vec<EmittedNode>,
    pub failures: Vec<NodeFailure>,
    /// Every tag-derived constraint that was checked and held.
    pub enforced: Vec<EnforcedConstraint>,
}

impl Lowering {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Assembled backend source: prelude, then each emitted node.
    pub fn source(&self) -> String {
        let mut out = self.prelude.clone();
        for (i, item) in self.emitted.iter().enumerate() {
            if i > 0 || !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&item.source);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Registry of backends plus the gating table.
#[derive(Clone)]
pub struct Dispatcher {
    backends: IndexMap<String, Arc<dyn Backend>>,
    gating: GatingPolicy,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .field("gating", &self.gating)
            .finish()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::with_builtin_backends(GatingPolicy::default())
    }
}

impl Dispatcher {
    /// A dispatcher with no backends.
    pub fn new(gating: GatingPolicy) -> Self {
        Dispatcher {
            backends: IndexMap::new(),
            gating,
        }
    }

    /// A dispatcher with the rust, go, zig and python backends registered.
    pub fn with_builtin_backends(gating: GatingPolicy) -> Self {
        let mut dispatcher = Dispatcher::new(gating);
        for backend in backends::builtin() {
            dispatcher.register(backend);
        }
        dispatcher
    }

    /// Registers `backend`, replacing any backend with the same name.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        self.backends.insert(backend.name().to_string(), backend);
    }

    pub fn backend(&self, target: &str) -> Option<&Arc<dyn Backend>> {
        self.backends.get(target)
    }

    pub fn backend_names(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    pub fn gating(&self) -> &GatingPolicy {
        &self.gating
    }

    /// Lowers every node it can; failures are per node.
    pub fn lower(&self, validated: &ValidatedFragment, target: &str) -> Result<Lowering, LowerError> {
        let backend = self.backend(target).ok_or_else(|| LowerError::UnknownBackend {
            target: target.to_string(),
            available: self.backend_names(),
        })?;
        let fragment = validated.fragment();
        let order = fragment.structural_order();
        let symbols: HashMap<NodeId, String> = order
            .iter()
            .enumerate()
            .map(|(pos, node)| (node.id(), format!("n{}", pos)))
            .collect();

        let mut lowering = Lowering {
            backend: backend.name().to_string(),
            fragment_hash: validated.semantic_hash(),
            prelude: backend.prelude(fragment),
            emitted: Vec::with_capacity(order.len()),
            failures: Vec::new(),
            enforced: Vec::new(),
        };

        for node in order {
            let symbol = symbols.get(&node.id()).cloned().unwrap_or_default();
            let fail = |cause| NodeFailure {
                node: node.id(),
                kind: node.kind_tag(),
                symbol: symbol.clone(),
                cause,
            };

            let enforced = match self.gating.check(node, backend.capabilities()) {
                Ok(enforced) => enforced,
                Err(rule) => {
                    let failure = fail(FailureCause::MissingCapability {
                        capability: rule.requires,
                        trigger: rule.trigger,
                    });
                    warn!(backend = %lowering.backend, %failure, "node gated out");
                    lowering.failures.push(failure);
                    continue;
                }
            };

            let cx = EmitContext {
                symbol: &symbol,
                fragment,
                capabilities: backend.capabilities(),
                symbols: &symbols,
            };
            match dispatch(backend.as_ref(), &cx, node) {
                Ok(source) => {
                    debug!(backend = %lowering.backend, node = %node.id(), symbol = %symbol, "node lowered");
                    lowering.enforced.extend(enforced);
                    lowering.emitted.push(EmittedNode {
                        node: node.id(),
                        symbol: symbol.clone(),
                        source,
                    });
                }
                Err(Unsupported { reason }) => {
                    let failure = fail(FailureCause::Unsupported { reason });
                    warn!(backend = %lowering.backend, %failure, "node unsupported");
                    lowering.failures.push(failure);
                }
            }
        }

        Ok(lowering)
    }

    /// Lowers the fragment and requires every node to succeed.
    pub fn lower_complete(&self, validated: &ValidatedFragment, target: &str) -> Result<Lowering, LowerError> {
        let lowering = self.lower(validated, target)?;
        if lowering.is_complete() {
            Ok(lowering)
        } else {
            Err(LowerError::Incomplete {
                backend: lowering.backend,
                failures: lowering.failures,
            })
        }
    }
}

/// Calls the emitter for `node`'s kind.
fn dispatch(backend: &dyn Backend, cx: &EmitContext<'_>, node: &Node) -> Result<String, Unsupported> {
    match node.kind() {
        NodeKind::Lambda { params, body } => backend.emit_lambda(cx, node, params, *body),
        NodeKind::Phi { incoming } => backend.emit_phi(cx, node, incoming),
        NodeKind::Sigma { effect, inner } => backend.emit_sigma(cx, node, *effect, *inner),
        NodeKind::Pi { regions } => backend.emit_pi(cx, node, regions),
        NodeKind::Gamma { proof, inner } => backend.emit_gamma(cx, node, proof, *inner),
        NodeKind::Omega { obligation } => backend.emit_omega(cx, node, obligation),
        NodeKind::Delta { trace } => backend.emit_delta(cx, node, trace),
    }
}
