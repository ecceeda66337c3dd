//! Expression helpers for the structural extractor
//!
//! Two jobs, both total (they never fail):
//!
//! - **Text reproduction** for base classes, decorators and annotations:
//!   canonical source-like text first, a structural dump of the subtree
//!   second, a fixed placeholder last.
//! - **Type-name extraction** for composition edges: bare identifiers,
//!   the last segment of dotted names, and names found inside string
//!   forward references (re-parsed as expressions).

use std::collections::BTreeSet;

use tree_sitter::{Node, Tree};

use super::traits::{find_syntax_error, get_node_text, parse_python};
use crate::constants::extraction::{EXPR_PLACEHOLDER, MAX_DUMP_NODES, MAX_EXPR_DEPTH};

// =============================================================================
// Text reproduction
// =============================================================================

/// Render an expression node as text. Never fails.
pub fn expression_text(node: Node, source: &[u8]) -> String {
    if let Some(text) = canonical_text(node, source) {
        return text;
    }

    if node.descendant_count() <= MAX_DUMP_NODES {
        let dump = node.to_sexp();
        if !dump.is_empty() {
            tracing::debug!("Falling back to structural dump for {}", node.kind());
            return dump;
        }
    }

    EXPR_PLACEHOLDER.to_string()
}

/// Source-like text only, without the dump and placeholder fallbacks
pub fn canonical_text(node: Node, source: &[u8]) -> Option<String> {
    unparse(node, source, 0)
}

/// Canonical rendering with normalized spacing, or `None` when the subtree
/// is malformed, too deep, or has no text.
fn unparse(node: Node, source: &[u8], depth: usize) -> Option<String> {
    if depth > MAX_EXPR_DEPTH || node.is_error() || node.is_missing() {
        return None;
    }
    let next = depth + 1;

    let text = match node.kind() {
        "identifier" | "keyword_identifier" | "integer" | "float" | "splat_type" => {
            non_empty(get_node_text(node, source))?
        }
        "true" => "True".to_string(),
        "false" => "False".to_string(),
        "none" => "None".to_string(),
        "ellipsis" => "...".to_string(),
        "type" => unparse(first_named(node)?, source, next)?,
        "attribute" => {
            let object = unparse(node.child_by_field_name("object")?, source, next)?;
            let attr = unparse(node.child_by_field_name("attribute")?, source, next)?;
            format!("{}.{}", object, attr)
        }
        "member_type" => {
            let parts = named(node);
            let (last, init) = parts.split_last()?;
            let base = unparse(*init.first()?, source, next)?;
            format!("{}.{}", base, unparse(*last, source, next)?)
        }
        "subscript" => {
            let value = unparse(node.child_by_field_name("value")?, source, next)?;
            let mut cursor = node.walk();
            let items = node
                .children_by_field_name("subscript", &mut cursor)
                .map(|n| unparse(n, source, next))
                .collect::<Option<Vec<_>>>()?;
            format!("{}[{}]", value, items.join(", "))
        }
        "generic_type" => {
            let parts = named(node);
            let base = unparse(*parts.first()?, source, next)?;
            let params = unparse(*parts.get(1)?, source, next)?;
            format!("{}{}", base, params)
        }
        "type_parameter" => format!("[{}]", join_named(node, source, next, ", ")?),
        "union_type" => join_named(node, source, next, " | ")?,
        "constrained_type" => join_named(node, source, next, ": ")?,
        "call" => {
            let function = unparse(node.child_by_field_name("function")?, source, next)?;
            let arguments = unparse(node.child_by_field_name("arguments")?, source, next)?;
            format!("{}{}", function, arguments)
        }
        "argument_list" => format!("({})", join_named(node, source, next, ", ")?),
        "keyword_argument" => {
            let name = unparse(node.child_by_field_name("name")?, source, next)?;
            let value = unparse(node.child_by_field_name("value")?, source, next)?;
            format!("{}={}", name, value)
        }
        "list_splat" => format!("*{}", unparse(first_named(node)?, source, next)?),
        "dictionary_splat" => format!("**{}", unparse(first_named(node)?, source, next)?),
        "list" => format!("[{}]", join_named(node, source, next, ", ")?),
        "set" => format!("{{{}}}", join_named(node, source, next, ", ")?),
        "tuple" => {
            let items = named(node);
            let rendered = join_named(node, source, next, ", ")?;
            if items.len() == 1 {
                format!("({},)", rendered)
            } else {
                format!("({})", rendered)
            }
        }
        "parenthesized_expression" => format!("({})", unparse(first_named(node)?, source, next)?),
        "binary_operator" | "boolean_operator" => {
            let left = unparse(node.child_by_field_name("left")?, source, next)?;
            let operator = get_node_text(node.child_by_field_name("operator")?, source);
            let right = unparse(node.child_by_field_name("right")?, source, next)?;
            format!("{} {} {}", left, operator, right)
        }
        "unary_operator" => {
            let operator = get_node_text(node.child_by_field_name("operator")?, source);
            let argument = unparse(node.child_by_field_name("argument")?, source, next)?;
            format!("{}{}", operator, argument)
        }
        "not_operator" => {
            let argument = unparse(node.child_by_field_name("argument")?, source, next)?;
            format!("not {}", argument)
        }
        "string" => render_string(node, source)?,
        _ => verbatim(node, source)?,
    };

    Some(text)
}

/// Source slice with whitespace runs collapsed to single spaces
fn verbatim(node: Node, source: &[u8]) -> Option<String> {
    if node.has_error() {
        return None;
    }
    let collapsed = get_node_text(node, source)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    non_empty(&collapsed)
}

/// Strings without interpolation are requoted (`"Foo"` and `"""Foo"""` →
/// `'Foo'`); multi-line content and f-strings with fields stay verbatim.
fn render_string(node: Node, source: &[u8]) -> Option<String> {
    let Some((prefix, content)) = plain_string_parts(node, source) else {
        return verbatim(node, source);
    };
    if content.contains(['\n', '\r']) {
        return verbatim(node, source);
    }
    let quote = if content.contains('\'') && !content.contains('"') {
        '"'
    } else {
        '\''
    };
    if content.contains(quote) {
        return verbatim(node, source);
    }
    Some(format!("{}{}{}{}", prefix, quote, content, quote))
}

/// Prefix and raw content of a string literal without interpolation.
///
/// Single and triple quotes both qualify; an f-string only when it has no
/// replacement fields (and no `{{` escapes).
fn plain_string_parts<'a>(node: Node, source: &'a [u8]) -> Option<(&'a str, &'a str)> {
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    let start = children.first().filter(|n| n.kind() == "string_start")?;
    let end = children.last().filter(|n| n.kind() == "string_end")?;

    let opening = get_node_text(*start, source);
    let prefix = opening.trim_end_matches(['"', '\'']);
    let quotes = opening.len() - prefix.len();
    if quotes != 1 && quotes != 3 {
        return None;
    }

    if children.iter().any(|n| n.kind() == "interpolation") {
        return None;
    }

    let content = std::str::from_utf8(source.get(start.end_byte()..end.start_byte())?).ok()?;
    if prefix.contains(['f', 'F']) && content.contains(['{', '}']) {
        return None;
    }
    Some((prefix, content))
}

// =============================================================================
// Type-name extraction
// =============================================================================

/// Type names referenced by an annotation or callee expression
pub fn type_names(node: Node, source: &[u8]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_type_names(node, source, &mut names, 0);
    names
}

/// Type names in a textual expression; unparseable text yields nothing
pub fn type_names_from_str(text: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_from_text(text, &mut names, 0);
    names
}

fn collect_from_text(text: &str, names: &mut BTreeSet<String>, depth: usize) {
    let Some(tree) = parse_standalone_expression(text) else {
        return;
    };
    if let Some(expr) = standalone_expression(&tree) {
        collect_type_names(expr, text.trim().as_bytes(), names, depth + 1);
    }
}

fn collect_type_names(node: Node, source: &[u8], names: &mut BTreeSet<String>, depth: usize) {
    if depth > MAX_EXPR_DEPTH {
        return;
    }
    let next = depth + 1;

    match node.kind() {
        "identifier" | "keyword_identifier" => {
            insert_name(names, get_node_text(node, source));
        }
        // module.B → B: the local name is what diagrams use
        "attribute" => {
            if let Some(attr) = node.child_by_field_name("attribute") {
                insert_name(names, get_node_text(attr, source));
            }
        }
        "member_type" => {
            if let Some(last) = named(node).last() {
                insert_name(names, get_node_text(*last, source));
            }
        }
        // Keyword names are not references; only the value is
        "keyword_argument" => {
            if let Some(value) = node.child_by_field_name("value") {
                collect_type_names(value, source, names, next);
            }
        }
        "lambda" => {
            if let Some(body) = node.child_by_field_name("body") {
                collect_type_names(body, source, names, next);
            }
        }
        "string" => match plain_string_parts(node, source) {
            Some((prefix, content)) if !prefix.contains(['b', 'B']) => {
                collect_from_text(content, names, next);
            }
            Some(_) => {}
            None => recurse_named(node, source, names, next),
        },
        "concatenated_string" => {
            let parts = named(node)
                .into_iter()
                .map(|s| plain_string_parts(s, source))
                .collect::<Option<Vec<_>>>();
            match parts {
                Some(parts) if parts.iter().all(|(p, _)| !p.contains(['b', 'B'])) => {
                    let joined: String = parts.iter().map(|(_, c)| *c).collect();
                    collect_from_text(&joined, names, next);
                }
                _ => recurse_named(node, source, names, next),
            }
        }
        "comment" => {}
        _ => recurse_named(node, source, names, next),
    }
}

fn recurse_named(node: Node, source: &[u8], names: &mut BTreeSet<String>, depth: usize) {
    for child in named(node) {
        collect_type_names(child, source, names, depth);
    }
}

fn insert_name(names: &mut BTreeSet<String>, name: &str) {
    if !name.is_empty() {
        names.insert(name.to_string());
    }
}

/// Parse text that must be exactly one expression (no statements)
fn parse_standalone_expression(text: &str) -> Option<Tree> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let tree = parse_python(trimmed).ok()?;
    if find_syntax_error(&tree).is_some() {
        return None;
    }
    standalone_expression(&tree)?;
    Some(tree)
}

fn standalone_expression(tree: &Tree) -> Option<Node<'_>> {
    let statements = named(tree.root_node());
    let [statement] = statements.as_slice() else {
        return None;
    };
    if statement.kind() != "expression_statement" {
        return None;
    }
    let exprs = named(*statement);
    match exprs.as_slice() {
        [expr] if !matches!(
            expr.kind(),
            "assignment" | "augmented_assignment" | "yield"
        ) =>
        {
            Some(*expr)
        }
        _ => None,
    }
}

// =============================================================================
// Node helpers
// =============================================================================

/// Named children without comments
fn named(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

fn first_named(node: Node) -> Option<Node> {
    named(node).into_iter().next()
}

fn join_named(node: Node, source: &[u8], depth: usize, sep: &str) -> Option<String> {
    let parts = named(node)
        .into_iter()
        .map(|n| unparse(n, source, depth))
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join(sep))
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        children.into_iter().find_map(|c| find_kind(c, kind))
    }

    /// Annotation node of `x: <annotation>`
    fn with_annotation<R>(annotation: &str, f: impl FnOnce(Node, &[u8]) -> R) -> R {
        let source = format!("x: {}\n", annotation);
        let tree = parse_python(&source).unwrap();
        let assignment = find_kind(tree.root_node(), "assignment").unwrap();
        let ty = assignment.child_by_field_name("type").unwrap();
        f(ty, source.as_bytes())
    }

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_decorator_call_text() {
        let source = "@decorator2(arg=1)\ndef f():\n    pass\n";
        let tree = parse_python(source).unwrap();
        let decorator = find_kind(tree.root_node(), "decorator").unwrap();
        let expr = first_named(decorator).unwrap();
        assert_eq!(expression_text(expr, source.as_bytes()), "decorator2(arg=1)");
    }

    #[test]
    fn test_qualified_generic_base_text() {
        let source = "class A(typing.Generic[T], metaclass=Meta):\n    pass\n";
        let tree = parse_python(source).unwrap();
        let args = find_kind(tree.root_node(), "argument_list").unwrap();
        let base = first_named(args).unwrap();
        assert_eq!(expression_text(base, source.as_bytes()), "typing.Generic[T]");
    }

    #[test]
    fn test_annotation_spacing_is_normalized() {
        let text = with_annotation("Dict[str,  int]", expression_text);
        assert_eq!(text, "Dict[str, int]");
    }

    #[test]
    fn test_union_annotation_text() {
        let text = with_annotation("int | None", expression_text);
        assert_eq!(text, "int | None");
    }

    #[test]
    fn test_string_annotation_is_requoted() {
        let text = with_annotation("\"Foo\"", expression_text);
        assert_eq!(text, "'Foo'");
    }

    #[test]
    fn test_type_names_from_generic() {
        let found = with_annotation("Optional[B]", type_names);
        assert_eq!(found, names(&["B", "Optional"]));
    }

    #[test]
    fn test_type_names_use_last_dotted_segment() {
        let found = with_annotation("models.user.User", type_names);
        assert_eq!(found, names(&["User"]));
    }

    #[test]
    fn test_triple_quoted_annotation_is_requoted() {
        let text = with_annotation("\"\"\"Foo\"\"\"", expression_text);
        assert_eq!(text, "'Foo'");

        let found = with_annotation("\"\"\"Foo\"\"\"", type_names);
        assert_eq!(found, names(&["Foo"]));
    }

    #[test]
    fn test_fstring_without_fields_is_a_forward_reference() {
        let found = with_annotation("f\"Foo\"", type_names);
        assert_eq!(found, names(&["Foo"]));
        assert_eq!(with_annotation("f\"Foo\"", expression_text), "f'Foo'");
    }

    #[test]
    fn test_multiline_triple_quoted_text_is_verbatim() {
        let text = with_annotation("\"\"\"\nFoo\n\"\"\"", expression_text);
        assert_eq!(text, "\"\"\" Foo \"\"\"");
        let found = with_annotation("\"\"\"\nFoo\n\"\"\"", type_names);
        assert_eq!(found, names(&["Foo"]));
    }

    #[test]
    fn test_type_names_from_forward_reference() {
        let found = with_annotation("list[\"pkg.Node\"]", type_names);
        assert_eq!(found, names(&["Node", "list"]));
    }

    #[test]
    fn test_unparseable_forward_reference_contributes_nothing() {
        let found = with_annotation("\"not valid (((\"", type_names);
        assert!(found.is_empty());
    }

    #[test]
    fn test_keyword_names_are_not_types() {
        let found = with_annotation("Annotated[int, Field(default=Config)]", type_names);
        assert_eq!(found, names(&["Annotated", "Config", "Field", "int"]));
    }

    #[test]
    fn test_type_names_from_str() {
        assert_eq!(type_names_from_str("a.b.Factory"), names(&["Factory"]));
        assert_eq!(type_names_from_str("Foo"), names(&["Foo"]));
        assert!(type_names_from_str("x = 1").is_empty());
        assert!(type_names_from_str("").is_empty());
    }

    #[test]
    fn test_none_is_not_a_name_node() {
        let found = with_annotation("Optional[None]", type_names);
        assert_eq!(found, names(&["Optional"]));
    }
}
