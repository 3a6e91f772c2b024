//! Mapping from front-end type annotations to target type syntax.
//!
//! Front-ends hand over type names as written in the source language, e.g.
//! `int`, `List[Optional[str]]`, `Dict<str, float>` or a bare tuple
//! `int, str`. [`parse_type`] turns such an annotation into a [`TypeExpr`]
//! tree; [`TypeDialect::render`] prints it in a target's syntax. Names the
//! dialect does not know pass through unchanged.

/// A parsed type annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named { name: String, args: Vec<TypeExpr> },
    Tuple(Vec<TypeExpr>),
}

impl TypeExpr {
    fn named(name: &str) -> Self {
        TypeExpr::Named {
            name: name.to_string(),
            args: Vec::new(),
        }
    }
}

/// Parses an annotation. Accepts `Name[..]`, `Name<..>` and `Name(..)`
/// generic forms and top-level comma tuples.
pub fn parse_type(annotation: &str) -> TypeExpr {
    let s = annotation.trim();
    let items = split_top_commas(s);
    if items.len() > 1 {
        return TypeExpr::Tuple(items.iter().map(|item| parse_type(item)).collect());
    }
    match split_generic(s) {
        Some((base, inner)) => TypeExpr::Named {
            name: base.trim().to_string(),
            args: split_top_commas(inner).iter().map(|item| parse_type(item)).collect(),
        },
        None => TypeExpr::named(s),
    }
}

fn split_generic(s: &str) -> Option<(&str, &str)> {
    for (open, close) in [('[', ']'), ('<', '>'), ('(', ')')] {
        if let Some(pos) = s.find(open) {
            if pos > 0 && s.ends_with(close) {
                return Some((&s[..pos], &s[pos + 1..s.len() - 1]));
            }
        }
    }
    None
}

fn split_top_commas(s: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        items.push(tail);
    }
    items
}

/// Target type syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDialect {
    Rust,
    Go,
    Zig,
    Python,
}

impl TypeDialect {
    /// Renders a raw annotation in this dialect.
    pub fn map(self, annotation: &str) -> String {
        self.render(&parse_type(annotation))
    }

    pub fn render(self, ty: &TypeExpr) -> String {
        match ty {
            TypeExpr::Tuple(items) => self.render_tuple(items),
            TypeExpr::Named { name, args } if args.is_empty() => self.scalar(name),
            TypeExpr::Named { name, args } => self.generic(name, args),
        }
    }

    fn scalar(self, name: &str) -> String {
        let mapped = match (self, name) {
            (TypeDialect::Rust, "int") => "i32",
            (TypeDialect::Rust, "float") => "f64",
            (TypeDialect::Rust, "str") => "String",
            (TypeDialect::Rust, "None") => "()",
            (TypeDialect::Go, "int") => "int32",
            (TypeDialect::Go, "float") => "float64",
            (TypeDialect::Go, "str") => "string",
            (TypeDialect::Go, "None") => "struct{}",
            (TypeDialect::Zig, "int") => "i32",
            (TypeDialect::Zig, "float") => "f64",
            (TypeDialect::Zig, "str") => "[]const u8",
            (TypeDialect::Zig, "None") => "void",
            (TypeDialect::Python, "None") => "None",
            (_, other) => other,
        };
        mapped.to_string()
    }

    fn generic(self, name: &str, args: &[TypeExpr]) -> String {
        let rendered: Vec<String> = args.iter().map(|arg| self.render(arg)).collect();
        match (self, name, rendered.as_slice()) {
            (TypeDialect::Rust, "List" | "list", [elem]) => format!("Vec<{}>", elem),
            (TypeDialect::Rust, "Optional", [inner]) => format!("Option<{}>", inner),
            (TypeDialect::Rust, "Dict" | "dict", [k, v]) => format!("std::collections::HashMap<{}, {}>", k, v),
            (TypeDialect::Go, "List" | "list", [elem]) => format!("[]{}", elem),
            (TypeDialect::Go, "Optional", [inner]) => format!("*{}", inner),
            (TypeDialect::Go, "Dict" | "dict", [k, v]) => format!("map[{}]{}", k, v),
            (TypeDialect::Zig, "List" | "list", [elem]) => format!("[]{}", elem),
            (TypeDialect::Zig, "Optional", [inner]) => format!("?{}", inner),
            (TypeDialect::Zig, "Dict" | "dict", [k, v]) => format!("std.AutoHashMap({}, {})", k, v),
            (TypeDialect::Python, "List", [elem]) => format!("list[{}]", elem),
            (TypeDialect::Python, "Dict", [k, v]) => format!("dict[{}, {}]", k, v),
            (TypeDialect::Python, _, _) => format!("{}[{}]", name, rendered.join(", ")),
            (TypeDialect::Go, _, _) => format!("{}[{}]", name, rendered.join(", ")),
            (TypeDialect::Zig, _, _) => format!("{}({})", name, rendered.join(", ")),
            (TypeDialect::Rust, _, _) => format!("{}<{}>", name, rendered.join(", ")),
        }
    }

    fn render_tuple(self, items: &[TypeExpr]) -> String {
        let rendered: Vec<String> = items.iter().map(|item| self.render(item)).collect();
        match self {
            TypeDialect::Rust => format!("({})", rendered.join(", ")),
            TypeDialect::Python => format!("tuple[{}]", rendered.join(", ")),
            TypeDialect::Zig => format!("struct {{ {} }}", rendered.join(", ")),
            TypeDialect::Go => format!(
                "struct{{ {} }}",
                rendered
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| format!("F{} {}", i, ty))
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_map_per_dialect() {
        assert_eq!(TypeDialect::Rust.map("int"), "i32");
        assert_eq!(TypeDialect::Rust.map("float"), "f64");
        assert_eq!(TypeDialect::Rust.map("str"), "String");
        assert_eq!(TypeDialect::Rust.map("bool"), "bool");
        assert_eq!(TypeDialect::Go.map("str"), "string");
        assert_eq!(TypeDialect::Zig.map("str"), "[]const u8");
        assert_eq!(TypeDialect::Python.map("int"), "int");
    }

    #[test]
    fn nested_generics() {
        assert_eq!(TypeDialect::Rust.map("List[Optional[int]]"), "Vec<Option<i32>>");
        assert_eq!(TypeDialect::Go.map("Dict<str, List<float>>"), "map[string][]float64");
        assert_eq!(TypeDialect::Zig.map("Optional[List[int]]"), "?[]i32");
        assert_eq!(TypeDialect::Python.map("List[Dict[str, int]]"), "list[dict[str, int]]");
    }

    #[test]
    fn tuples_and_unknown_names() {
        assert_eq!(TypeDialect::Rust.map("int, str"), "(i32, String)");
        assert_eq!(TypeDialect::Rust.map("Matrix"), "Matrix");
        assert_eq!(TypeDialect::Rust.map("Pair<int, bool>"), "Pair<i32, bool>");
    }

    #[test]
    fn parse_keeps_structure() {
        assert_eq!(
            parse_type(" Map[ str , List[int] ] "),
            TypeExpr::Named {
                name: "Map".into(),
                args: vec![
                    TypeExpr::named("str"),
                    TypeExpr::Named {
                        name: "List".into(),
                        args: vec![TypeExpr::named("int")]
                    },
                ],
            }
        );
    }
}
