//! Zig backend.

use ueg_core::{EffectKind, Fragment, Node, NodeId, ObligationId, Param, Property, ProofRef};

use super::{byte_list, checked_params, constant, invoke, invoke_all, is_threaded, quoted};
use crate::backend::{Backend, EmitContext, Unsupported};
use crate::capability::{Capability, CapabilitySet};
use crate::types::TypeDialect;

/// Words a Zig parameter may not be named: keywords, primitive types and
/// the `std` import every output declares.
const RESERVED: &[&str] = &[
    "addrspace", "align", "allowzero", "and", "anyframe", "anytype", "asm", "async", "await", "break",
    "callconv", "catch", "comptime", "const", "continue", "defer", "else", "enum", "errdefer", "error",
    "export", "extern", "fn", "for", "if", "inline", "linksection", "noalias", "noinline", "nosuspend",
    "opaque", "or", "orelse", "packed", "pub", "resume", "return", "struct", "suspend", "switch", "test",
    "threadlocal", "try", "union", "unreachable", "usingnamespace", "var", "volatile", "while",
    "anyerror", "anyopaque", "bool", "comptime_float", "comptime_int", "f16", "f32", "f64", "f80",
    "f128", "i8", "i16", "i32", "i64", "i128", "isize", "noreturn", "type", "u8", "u16", "u32", "u64",
    "u128", "usize", "void", "std",
];

/// Emits Zig. Safety-checked builds trap on overflow; there is no
/// proof-carrying output and no async.
#[derive(Debug, Clone)]
pub struct ZigBackend {
    capabilities: CapabilitySet,
}

impl Default for ZigBackend {
    fn default() -> Self {
        ZigBackend {
            capabilities: [Capability::CheckedOverflow].into(),
        }
    }
}

impl ZigBackend {
    fn func(&self, cx: &EmitContext<'_>, node: &Node, signature: &str, body: &[String]) -> String {
        let visibility = if node.id() == cx.fragment.entry() { "pub " } else { "" };
        let mut out = format!("{}fn {}{} void {{\n", visibility, cx.symbol, signature);
        if node.tags().has(Property::NoOverflow) {
            out.push_str("    @setRuntimeSafety(true);\n");
        }
        for line in body {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}

impl Backend for ZigBackend {
    fn name(&self) -> &str {
        "zig"
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    fn prelude(&self, _fragment: &Fragment) -> String {
        "const std = @import(\"std\");\n".to_string()
    }

    fn emit_lambda(
        &self,
        cx: &EmitContext<'_>,
        node: &Node,
        params: &[Param],
        body: NodeId,
    ) -> Result<String, Unsupported> {
        let params = checked_params(params, RESERVED)?;
        let signature = params
            .iter()
            .map(|p| format!("{}: {}", p.name, TypeDialect::Zig.map(&p.ty.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut lines: Vec<String> = params.iter().map(|p| format!("_ = {};", p.name)).collect();
        lines.push(format!("{};", invoke(cx, body)?));
        Ok(self.func(cx, node, &format!("({})", signature), &lines))
    }

    fn emit_phi(&self, cx: &EmitContext<'_>, node: &Node, incoming: &[NodeId]) -> Result<String, Unsupported> {
        let mut body = vec!["switch (branch) {".to_string()];
        for (i, call) in invoke_all(cx, incoming)?.into_iter().enumerate() {
            body.push(format!("    {} => {},", i, call));
        }
        body.push("    else => {},".to_string());
        body.push("}".to_string());
        Ok(self.func(cx, node, "(branch: usize)", &body))
    }

    fn emit_sigma(
        &self,
        cx: &EmitContext<'_>,
        node: &Node,
        effect: EffectKind,
        inner: NodeId,
    ) -> Result<String, Unsupported> {
        let call = format!("{};", invoke(cx, inner)?);
        let body = match effect {
            EffectKind::Io | EffectKind::Mut => vec![format!("// effect: {}", effect), call],
            EffectKind::Throw => vec![call, format!("@panic(\"{} raised\");", cx.symbol)],
            EffectKind::Terminate => vec![call, "std.process.exit(0);".to_string()],
            EffectKind::Async => return Err(Unsupported::new("zig has no async functions")),
        };
        Ok(self.func(cx, node, "()", &body))
    }

    fn emit_pi(&self, cx: &EmitContext<'_>, node: &Node, regions: &[NodeId]) -> Result<String, Unsupported> {
        let calls = invoke_all(cx, regions)?;
        let body = if is_threaded(node) {
            let mut body = Vec::with_capacity(calls.len() * 2);
            for (i, call) in calls.iter().enumerate() {
                let (callee, args) = call.split_once('(').unwrap_or((call.as_str(), ")"));
                let args = args.trim_end_matches(')');
                body.push(format!(
                    "const t{} = std.Thread.spawn(.{{}}, {}, .{{{}}}) catch unreachable;",
                    i, callee, args
                ));
            }
            body.extend((0..calls.len()).map(|i| format!("t{}.join();", i)));
            body
        } else {
            calls.iter().map(|call| format!("{};", call)).collect()
        };
        Ok(self.func(cx, node, "()", &body))
    }

    fn emit_gamma(
        &self,
        cx: &EmitContext<'_>,
        node: &Node,
        proof: &ProofRef,
        inner: NodeId,
    ) -> Result<String, Unsupported> {
        let decl = format!("const {} = {};\n\n", constant(cx.symbol, "PROOF"), quoted(proof.as_str()));
        Ok(decl + &self.func(cx, node, "()", &[format!("{};", invoke(cx, inner)?)]))
    }

    fn emit_omega(
        &self,
        cx: &EmitContext<'_>,
        node: &Node,
        obligation: &ObligationId,
    ) -> Result<String, Unsupported> {
        let decl = format!(
            "const {} = {};\n\n",
            constant(cx.symbol, "OBLIGATION"),
            quoted(obligation.as_str())
        );
        Ok(decl + &self.func(cx, node, "()", &[]))
    }

    fn emit_delta(&self, cx: &EmitContext<'_>, node: &Node, trace: &[u8]) -> Result<String, Unsupported> {
        let decl = format!(
            "const {} = [_]u8{{ {} }};\n\n",
            constant(cx.symbol, "TRACE"),
            byte_list(trace)
        );
        Ok(decl + &self.func(cx, node, "()", &[]))
    }
}
