//! Python backend.

use ueg_core::{EffectKind, Fragment, Node, NodeId, ObligationId, Param, ProofRef};

use super::{
    any_threaded, byte_list, checked_params, constant, invoke, invoke_all, is_threaded, quoted, uses_effect,
};
use crate::backend::{Backend, EmitContext, Unsupported};
use crate::capability::{Capability, CapabilitySet};
use crate::types::TypeDialect;

/// Words a Python parameter may not be named.
const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in",
    "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Emits Python 3. Integers are arbitrary precision, so overflow cannot
/// occur; the interpreter gives no timing or proof guarantees.
#[derive(Debug, Clone)]
pub struct PythonBackend {
    capabilities: CapabilitySet,
}

impl Default for PythonBackend {
    fn default() -> Self {
        PythonBackend {
            capabilities: [Capability::CheckedOverflow].into(),
        }
    }
}

fn def(symbol: &str, signature: &str, body: &[String]) -> String {
    let mut out = format!("def {}{}:\n", symbol, signature);
    if body.is_empty() {
        out.push_str("    pass\n");
    }
    for line in body {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

impl Backend for PythonBackend {
    fn name(&self) -> &str {
        "python"
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    fn prelude(&self, fragment: &Fragment) -> String {
        let mut out = String::new();
        if uses_effect(fragment, EffectKind::Terminate) {
            out.push_str("import sys\n");
        }
        if uses_effect(fragment, EffectKind::Async) {
            out.push_str("import threading\n");
        }
        if any_threaded(fragment) {
            out.push_str("from concurrent.futures import ThreadPoolExecutor\n");
        }
        out
    }

    fn emit_lambda(
        &self,
        cx: &EmitContext<'_>,
        _node: &Node,
        params: &[Param],
        body: NodeId,
    ) -> Result<String, Unsupported> {
        let signature = checked_params(params, RESERVED)?
            .iter()
            .map(|p| format!("{}: {}", p.name, TypeDialect::Python.map(&p.ty.name)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(def(cx.symbol, &format!("({})", signature), &[invoke(cx, body)?]))
    }

    fn emit_phi(&self, cx: &EmitContext<'_>, _node: &Node, incoming: &[NodeId]) -> Result<String, Unsupported> {
        let mut body = Vec::new();
        for (i, call) in invoke_all(cx, incoming)?.into_iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "elif" };
            body.push(format!("{} branch == {}:", keyword, i));
            body.push(format!("    {}", call));
        }
        Ok(def(cx.symbol, "(branch: int)", &body))
    }

    fn emit_sigma(
        &self,
        cx: &EmitContext<'_>,
        _node: &Node,
        effect: EffectKind,
        inner: NodeId,
    ) -> Result<String, Unsupported> {
        let call = invoke(cx, inner)?;
        let body = match effect {
            EffectKind::Io | EffectKind::Mut => vec![format!("# effect: {}", effect), call],
            EffectKind::Throw => vec![call, format!("raise RuntimeError(\"{} raised\")", cx.symbol)],
            EffectKind::Async => vec![format!(
                "threading.Thread(target=lambda: {}).start()",
                call
            )],
            EffectKind::Terminate => vec![call, "sys.exit(0)".to_string()],
        };
        Ok(def(cx.symbol, "()", &body))
    }

    fn emit_pi(&self, cx: &EmitContext<'_>, node: &Node, regions: &[NodeId]) -> Result<String, Unsupported> {
        let calls = invoke_all(cx, regions)?;
        let body = if is_threaded(node) && !calls.is_empty() {
            let mut body = vec!["with ThreadPoolExecutor() as pool:".to_string()];
            body.extend(calls.iter().map(|call| format!("    pool.submit(lambda: {})", call)));
            body
        } else {
            calls
        };
        Ok(def(cx.symbol, "()", &body))
    }

    fn emit_gamma(
        &self,
        cx: &EmitContext<'_>,
        _node: &Node,
        proof: &ProofRef,
        inner: NodeId,
    ) -> Result<String, Unsupported> {
        let decl = format!("{} = {}\n\n", constant(cx.symbol, "PROOF"), quoted(proof.as_str()));
        Ok(decl + &def(cx.symbol, "()", &[invoke(cx, inner)?]))
    }

    fn emit_omega(
        &self,
        cx: &EmitContext<'_>,
        _node: &Node,
        obligation: &ObligationId,
    ) -> Result<String, Unsupported> {
        let decl = format!(
            "{} = {}\n\n",
            constant(cx.symbol, "OBLIGATION"),
            quoted(obligation.as_str())
        );
        Ok(decl + &def(cx.symbol, "()", &[]))
    }

    fn emit_delta(&self, cx: &EmitContext<'_>, _node: &Node, trace: &[u8]) -> Result<String, Unsupported> {
        let decl = format!("{} = bytes([{}])\n\n", constant(cx.symbol, "TRACE"), byte_list(trace));
        Ok(decl + &def(cx.symbol, "()", &[]))
    }
}
