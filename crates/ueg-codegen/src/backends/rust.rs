//! Rust backend.

use ueg_core::{EffectKind, Node, NodeId, ObligationId, Param, ProofRef};

use super::{byte_list, checked_params, constant, invoke, invoke_all, is_threaded, quoted};
use crate::backend::{Backend, EmitContext, Unsupported};
use crate::capability::{Capability, CapabilitySet};
use crate::types::TypeDialect;

/// Words a Rust parameter may not be named.
const RESERVED: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in", "let", "loop",
    "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "self", "Self",
    "static", "struct", "super", "trait", "true", "try", "type", "typeof", "union", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Emits Rust. Proofs travel as constants. Whether arithmetic traps on
/// overflow depends on the consumer's build profile, not on the emitted
/// source, so the backend does not claim checked overflow; the optimizer
/// gives no constant-time guarantee either.
#[derive(Debug, Clone)]
pub struct RustBackend {
    capabilities: CapabilitySet,
}

impl Default for RustBackend {
    fn default() -> Self {
        RustBackend {
            capabilities: [Capability::ProofCarryingCodegen].into(),
        }
    }
}

impl RustBackend {
    fn header(&self, cx: &EmitContext<'_>, node: &Node) -> String {
        if node.id() == cx.fragment.entry() {
            "pub ".to_string()
        } else {
            String::new()
        }
    }

    fn procedure(&self, cx: &EmitContext<'_>, node: &Node, signature: &str, body: &[String]) -> String {
        let mut out = format!("{}fn {}{} {{\n", self.header(cx, node), cx.symbol, signature);
        for line in body {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}

impl Backend for RustBackend {
    fn name(&self) -> &str {
        "rust"
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    fn prelude(&self, _fragment: &ueg_core::Fragment) -> String {
        "#![allow(dead_code, unused_variables)]\n".to_string()
    }

    fn emit_lambda(
        &self,
        cx: &EmitContext<'_>,
        node: &Node,
        params: &[Param],
        body: NodeId,
    ) -> Result<String, Unsupported> {
        let params = checked_params(params, RESERVED)?;
        let mut docs = String::new();
        for param in params {
            if let Some(proof) = &param.ty.refinement {
                docs.push_str(&format!("/// `{}` refined by `{}`\n", param.name, proof));
            }
        }
        let signature = params
            .iter()
            .map(|p| format!("{}: {}", p.name, TypeDialect::Rust.map(&p.ty.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let call = format!("{};", invoke(cx, body)?);
        Ok(docs + &self.procedure(cx, node, &format!("({})", signature), &[call]))
    }

    fn emit_phi(&self, cx: &EmitContext<'_>, node: &Node, incoming: &[NodeId]) -> Result<String, Unsupported> {
        let mut body = vec!["match branch {".to_string()];
        for (i, call) in invoke_all(cx, incoming)?.into_iter().enumerate() {
            body.push(format!("    {} => {},", i, call));
        }
        body.push("    _ => {}".to_string());
        body.push("}".to_string());
        Ok(self.procedure(cx, node, "(branch: usize)", &body))
    }

    fn emit_sigma(
        &self,
        cx: &EmitContext<'_>,
        node: &Node,
        effect: EffectKind,
        inner: NodeId,
    ) -> Result<String, Unsupported> {
        let call = invoke(cx, inner)?;
        let body = match effect {
            EffectKind::Io | EffectKind::Mut => vec![format!("// effect: {}", effect), format!("{};", call)],
            EffectKind::Throw => vec![format!("{};", call), format!("panic!(\"{} raised\");", cx.symbol)],
            EffectKind::Async => vec![format!("std::thread::spawn(|| {});", call)],
            EffectKind::Terminate => vec![format!("{};", call), "std::process::exit(0);".to_string()],
        };
        Ok(self.procedure(cx, node, "()", &body))
    }

    fn emit_pi(&self, cx: &EmitContext<'_>, node: &Node, regions: &[NodeId]) -> Result<String, Unsupported> {
        let calls = invoke_all(cx, regions)?;
        let body = if is_threaded(node) {
            let mut body = vec!["std::thread::scope(|s| {".to_string()];
            body.extend(calls.iter().map(|call| format!("    s.spawn(|| {});", call)));
            body.push("});".to_string());
            body
        } else {
            calls.iter().map(|call| format!("{};", call)).collect()
        };
        Ok(self.procedure(cx, node, "()", &body))
    }

    fn emit_gamma(
        &self,
        cx: &EmitContext<'_>,
        node: &Node,
        proof: &ProofRef,
        inner: NodeId,
    ) -> Result<String, Unsupported> {
        let name = constant(cx.symbol, "PROOF");
        let decl = format!("const {}: &str = {};\n\n", name, quoted(proof.as_str()));
        let body = [format!("{};", invoke(cx, inner)?)];
        Ok(decl + &self.procedure(cx, node, "()", &body))
    }

    fn emit_omega(
        &self,
        cx: &EmitContext<'_>,
        node: &Node,
        obligation: &ObligationId,
    ) -> Result<String, Unsupported> {
        let name = constant(cx.symbol, "OBLIGATION");
        let decl = format!("const {}: &str = {};\n\n", name, quoted(obligation.as_str()));
        Ok(decl + &self.procedure(cx, node, "()", &[]))
    }

    fn emit_delta(&self, cx: &EmitContext<'_>, node: &Node, trace: &[u8]) -> Result<String, Unsupported> {
        let name = constant(cx.symbol, "TRACE");
        let decl = format!("static {}: [u8; {}] = [{}];\n\n", name, trace.len(), byte_list(trace));
        Ok(decl + &self.procedure(cx, node, "()", &[]))
    }
}
