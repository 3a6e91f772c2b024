//! Go backend.

use ueg_core::{EffectKind, Fragment, Node, NodeId, ObligationId, Param, ProofRef};

use super::{
    any_threaded, byte_list, checked_params, constant, invoke, invoke_all, is_threaded, quoted, uses_effect,
};
use crate::backend::{Backend, EmitContext, Unsupported};
use crate::capability::CapabilitySet;
use crate::types::TypeDialect;

/// Words a Go parameter may not be named.
const RESERVED: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough", "for",
    "func", "go", "goto", "if", "import", "interface", "map", "package", "range", "return", "select",
    "struct", "switch", "type", "var",
];

/// Emits Go. Declares no capabilities: integer arithmetic wraps silently and
/// there is no proof-carrying output.
#[derive(Debug, Clone, Default)]
pub struct GoBackend {
    capabilities: CapabilitySet,
}

fn func(symbol: &str, signature: &str, body: &[String]) -> String {
    let mut out = format!("func {}{} {{\n", symbol, signature);
    for line in body {
        out.push('\t');
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("}\n");
    out
}

impl Backend for GoBackend {
    fn name(&self) -> &str {
        "go"
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    fn prelude(&self, fragment: &Fragment) -> String {
        let mut imports = Vec::new();
        if uses_effect(fragment, EffectKind::Terminate) {
            imports.push("\"os\"");
        }
        if any_threaded(fragment) {
            imports.push("\"sync\"");
        }
        let mut out = "package main\n".to_string();
        match imports.as_slice() {
            [] => {}
            [single] => out.push_str(&format!("\nimport {}\n", single)),
            many => out.push_str(&format!("\nimport (\n\t{}\n)\n", many.join("\n\t"))),
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
            .map(|p| format!("{} {}", p.name, TypeDialect::Go.map(&p.ty.name)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(func(cx.symbol, &format!("({})", signature), &[invoke(cx, body)?]))
    }

    fn emit_phi(&self, cx: &EmitContext<'_>, _node: &Node, incoming: &[NodeId]) -> Result<String, Unsupported> {
        let mut body = vec!["switch branch {".to_string()];
        for (i, call) in invoke_all(cx, incoming)?.into_iter().enumerate() {
            body.push(format!("case {}:", i));
            body.push(format!("\t{}", call));
        }
        body.push("}".to_string());
        Ok(func(cx.symbol, "(branch int)", &body))
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
            EffectKind::Io | EffectKind::Mut => vec![format!("// effect: {}", effect), call],
            EffectKind::Throw => vec![call, format!("panic(\"{} raised\")", cx.symbol)],
            EffectKind::Async => vec![format!("go {}", call)],
            EffectKind::Terminate => vec![call, "os.Exit(0)".to_string()],
        };
        Ok(func(cx.symbol, "()", &body))
    }

    fn emit_pi(&self, cx: &EmitContext<'_>, node: &Node, regions: &[NodeId]) -> Result<String, Unsupported> {
        let calls = invoke_all(cx, regions)?;
        let body = if is_threaded(node) {
            let mut body = vec![
                "var wg sync.WaitGroup".to_string(),
                format!("wg.Add({})", calls.len()),
            ];
            body.extend(
                calls
                    .iter()
                    .map(|call| format!("go func() {{ defer wg.Done(); {} }}()", call)),
            );
            body.push("wg.Wait()".to_string());
            body
        } else {
            calls
        };
        Ok(func(cx.symbol, "()", &body))
    }

    fn emit_gamma(
        &self,
        cx: &EmitContext<'_>,
        _node: &Node,
        proof: &ProofRef,
        inner: NodeId,
    ) -> Result<String, Unsupported> {
        // only reached when a custom gating table drops the Gamma rule
        let decl = format!("const {} = {}\n\n", constant(cx.symbol, "PROOF"), quoted(proof.as_str()));
        Ok(decl + &func(cx.symbol, "()", &[invoke(cx, inner)?]))
    }

    fn emit_omega(
        &self,
        cx: &EmitContext<'_>,
        _node: &Node,
        obligation: &ObligationId,
    ) -> Result<String, Unsupported> {
        let decl = format!(
            "const {} = {}\n\n",
            constant(cx.symbol, "OBLIGATION"),
            quoted(obligation.as_str())
        );
        Ok(decl + &func(cx.symbol, "()", &[]))
    }

    fn emit_delta(&self, cx: &EmitContext<'_>, _node: &Node, trace: &[u8]) -> Result<String, Unsupported> {
        let decl = format!(
            "var {} = []byte{{{}}}\n\n",
            constant(cx.symbol, "TRACE"),
            byte_list(trace)
        );
        Ok(decl + &func(cx.symbol, "()", &[]))
    }
}
