//! Built-in backends.
//!
//! All built-in backends share one lowering model: every node becomes a
//! procedure named by its structural symbol (`n0`, `n1`, ...), and every
//! expression slot becomes a call to the referenced node's procedure. A Phi
//! procedure takes the index of the incoming edge to follow; calls into a
//! Phi take its first edge. A Lambda procedure takes its declared
//! parameters, so it can be an entry point but no slot can call it: the
//! graph carries no argument values.
//!
//! Parameter names and annotations are the only front-end text pasted into
//! generated source. [`checked_params`] refuses any that are not plain
//! identifiers in the target language.

pub mod go;
pub mod python;
pub mod rust;
pub mod zig;

use std::sync::Arc;

use ueg_core::{is_identifier, ConcurrencyModel, EffectKind, Fragment, Node, NodeId, NodeKind, Param};

use crate::backend::{Backend, EmitContext, Unsupported};

pub use go::GoBackend;
pub use python::PythonBackend;
pub use rust::RustBackend;
pub use zig::ZigBackend;

/// One instance of every built-in backend.
pub fn builtin() -> Vec<Arc<dyn Backend>> {
    vec![
        Arc::new(RustBackend::default()),
        Arc::new(GoBackend::default()),
        Arc::new(ZigBackend::default()),
        Arc::new(PythonBackend::default()),
    ]
}

/// Call expression for the procedure of node `id`, without terminator.
pub(crate) fn invoke(cx: &EmitContext<'_>, id: NodeId) -> Result<String, Unsupported> {
    let symbol = cx.symbol_of(id)?;
    let args = match cx.fragment.node(id).map(Node::kind) {
        Some(NodeKind::Phi { .. }) => "0",
        Some(NodeKind::Lambda { params, .. }) if !params.is_empty() => {
            return Err(Unsupported::new(format!(
                "cannot call {}: lambda takes {} parameter(s) and no argument values exist",
                symbol,
                params.len()
            )));
        }
        _ => "",
    };
    Ok(format!("{}({})", symbol, args))
}

/// Returns `params` when every name and annotation can be pasted into the
/// target's source: names are identifiers outside `reserved` that do not
/// collide with a node procedure, annotations are plain type expressions.
pub(crate) fn checked_params<'p>(params: &'p [Param], reserved: &[&str]) -> Result<&'p [Param], Unsupported> {
    for param in params {
        let name = param.name.as_str();
        if !is_identifier(name) || name == "_" {
            return Err(Unsupported::new(format!("parameter name {} is not an identifier", quoted(name))));
        }
        if reserved.contains(&name) {
            return Err(Unsupported::new(format!("parameter name '{}' is a reserved word", name)));
        }
        if is_procedure_symbol(name) {
            return Err(Unsupported::new(format!("parameter name '{}' shadows a node procedure", name)));
        }
        if !param.ty.is_well_formed() {
            return Err(Unsupported::new(format!(
                "type {} of parameter '{}' is not a plain annotation",
                quoted(&param.ty.name),
                name
            )));
        }
    }
    Ok(params)
}

/// `n` followed by digits, the shape of every structural symbol.
fn is_procedure_symbol(name: &str) -> bool {
    name.strip_prefix('n')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

pub(crate) fn invoke_all(cx: &EmitContext<'_>, ids: &[NodeId]) -> Result<Vec<String>, Unsupported> {
    ids.iter().map(|id| invoke(cx, *id)).collect()
}

/// True for a Pi node that should lower to a parallel construct.
pub(crate) fn is_threaded(node: &Node) -> bool {
    matches!(node.kind(), NodeKind::Pi { .. }) && node.tags().concurrency_model == ConcurrencyModel::Threads
}

pub(crate) fn any_threaded(fragment: &Fragment) -> bool {
    fragment.nodes().iter().any(is_threaded)
}

pub(crate) fn uses_effect(fragment: &Fragment, effect: EffectKind) -> bool {
    fragment
        .nodes()
        .iter()
        .any(|n| matches!(n.kind(), NodeKind::Sigma { effect: e, .. } if *e == effect))
}

/// Upper-case constant name derived from a symbol.
pub(crate) fn constant(symbol: &str, suffix: &str) -> String {
    format!("{}_{}", symbol.to_ascii_uppercase(), suffix)
}

pub(crate) fn byte_list(trace: &[u8]) -> String {
    trace.iter().map(u8::to_string).collect::<Vec<_>>().join(", ")
}

/// Escapes text for a double-quoted string literal.
pub(crate) fn quoted(text: &str) -> String {
    format!("{:?}", text)
}

#[cfg(test)]
mod tests {
    use ueg_core::Type;

    use super::*;

    #[test]
    fn checked_params_refuses_text_that_is_not_an_identifier() {
        let ok = [Param::new("xs", Type::named("List[int]"))];
        assert!(checked_params(&ok, &["fn"]).is_ok());

        for (name, ty) in [
            ("x: i32) {} fn evil() {} fn y(z", "int"),
            ("fn", "int"),
            ("n12", "int"),
            ("_", "int"),
            ("x", "int; drop"),
        ] {
            let params = [Param::new(name, Type::named(ty))];
            assert!(checked_params(&params, &["fn"]).is_err(), "{name}: {ty}");
        }
    }

    #[test]
    fn procedure_symbols() {
        assert!(is_procedure_symbol("n0"));
        assert!(is_procedure_symbol("n42"));
        assert!(!is_procedure_symbol("n"));
        assert!(!is_procedure_symbol("nx"));
        assert!(!is_procedure_symbol("name"));
    }
}
