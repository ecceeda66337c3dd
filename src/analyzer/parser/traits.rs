use std::path::Path;

use tree_sitter::{Node, Tree};

use crate::types::{ModuleError, ModuleInfo, PyarchError, Result};

/// Turns one source file into a module model.
///
/// Implementations never fail: unreadable or malformed files come back as
/// empty modules carrying error metadata.
pub trait Extractor: Send + Sync {
    fn extract_file(&self, path: &Path) -> ModuleInfo;
}

/// Extract text content from a tree-sitter node.
/// Returns empty string if extraction fails (with debug logging).
#[inline]
pub fn get_node_text<'a>(node: Node, content: &'a [u8]) -> &'a str {
    node.utf8_text(content).unwrap_or_else(|e| {
        tracing::debug!(
            "UTF-8 extraction failed at {}:{}-{}:{}: {}",
            node.start_position().row + 1,
            node.start_position().column,
            node.end_position().row + 1,
            node.end_position().column,
            e
        );
        ""
    })
}

/// 1-based start line of a node
#[inline]
pub fn node_line(node: Node) -> usize {
    node.start_position().row + 1
}

/// Extract position information from a tree-sitter node.
/// Lines are 1-based, columns 0-based.
pub fn get_node_position(node: Node) -> (usize, usize, usize, usize) {
    let start = node.start_position();
    let end = node.end_position();
    (start.row + 1, end.row + 1, start.column, end.column)
}

/// Create a tree-sitter parser for the given language.
pub fn create_ts_parser<L: Into<tree_sitter::Language>>(
    language: L,
    lang_name: &str,
) -> Result<tree_sitter::Parser> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language.into())
        .map_err(|e| PyarchError::Parse {
            message: format!("Failed to set {} language: {}", lang_name, e),
            path: String::new(),
        })?;
    Ok(parser)
}

/// Parse Python source text into a tree
pub fn parse_python(content: &str) -> Result<Tree> {
    let mut parser = create_ts_parser(tree_sitter_python::LANGUAGE, "Python")?;
    parser
        .parse(content, None)
        .ok_or_else(|| PyarchError::parse("<source>", "Parser returned no tree"))
}

/// Locate the first syntax error in document order.
///
/// tree-sitter recovers from malformed input by inserting `ERROR` and
/// zero-width `MISSING` nodes; the first of either is reported the way a
/// compiler would report it (1-based line and column). The grammar also
/// accepts a few Python 2 statements that Python 3 rejects; those count as
/// syntax errors too.
pub fn find_syntax_error(tree: &Tree) -> Option<ModuleError> {
    let recovered = find_recovery_node(tree);
    let legacy = find_legacy_statement(tree);
    match (recovered, legacy) {
        (Some(a), Some(b)) => Some(if (b.line, b.column) < (a.line, a.column) { b } else { a }),
        (a, b) => a.or(b),
    }
}

fn find_recovery_node(tree: &Tree) -> Option<ModuleError> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }

    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_missing() {
            return Some(syntax_error_at(node, format!("missing '{}'", node.kind())));
        }
        if node.is_error() {
            return Some(syntax_error_at(node, "invalid syntax"));
        }

        // Only descend into subtrees that contain the error
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                // has_error() on the root guarantees we find something first
                return Some(syntax_error_at(root, "invalid syntax"));
            }
        }
    }
}

/// First `print x`, `exec code` or `except E, e:` in document order
fn find_legacy_statement(tree: &Tree) -> Option<ModuleError> {
    let mut cursor = tree.root_node().walk();
    loop {
        let node = cursor.node();
        if let Some(message) = legacy_message(node) {
            return Some(syntax_error_at(node, message));
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn legacy_message(node: Node) -> Option<&'static str> {
    match node.kind() {
        "print_statement" => Some("missing parentheses in call to 'print'"),
        "exec_statement" => Some("missing parentheses in call to 'exec'"),
        "except_clause" => {
            let mut cursor = node.walk();
            let comma_form = node.children(&mut cursor).any(|c| c.kind() == ",");
            comma_form.then_some("multiple exception types must be parenthesized")
        }
        _ => None,
    }
}

fn syntax_error_at(node: Node, message: impl Into<String>) -> ModuleError {
    let (line, _, column, _) = get_node_position(node);
    ModuleError::syntax(message, line, column + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_source_has_no_error() {
        let tree = parse_python("def f():\n    return 1\n").unwrap();
        assert!(find_syntax_error(&tree).is_none());
    }

    #[test]
    fn test_syntax_error_location() {
        let tree = parse_python("x = 1\ndef broken(:\n    pass\n").unwrap();
        let err = find_syntax_error(&tree).unwrap();
        assert_eq!(err.line, Some(2));
        assert!(err.column.unwrap() >= 1);
    }

    #[test]
    fn test_python2_statements_are_syntax_errors() {
        let cases = [
            ("x = 1\nprint 'hello'\n", "print", 2),
            ("exec 'x = 1'\n", "exec", 1),
            ("try:\n    pass\nexcept ValueError, e:\n    pass\n", "parenthesized", 3),
        ];
        for (source, needle, line) in cases {
            let tree = parse_python(source).unwrap();
            let err = find_syntax_error(&tree)
                .unwrap_or_else(|| panic!("no error for {:?}", source));
            assert!(err.message.contains(needle), "{}", err.message);
            assert_eq!(err.line, Some(line));
            assert_eq!(err.column, Some(1));
        }
    }

    #[test]
    fn test_python3_forms_are_accepted() {
        let source = "\
print('hello')
print(*args, sep='')
exec(code)
try:
    pass
except (ValueError, TypeError) as e:
    pass
";
        let tree = parse_python(source).unwrap();
        assert!(find_syntax_error(&tree).is_none());
    }

    #[test]
    fn test_node_text_and_line() {
        let source = "\n\nclass A:\n    pass\n";
        let tree = parse_python(source).unwrap();
        let class_node = tree.root_node().named_child(0).unwrap();
        assert_eq!(class_node.kind(), "class_definition");
        assert_eq!(node_line(class_node), 3);

        let name = class_node.child_by_field_name("name").unwrap();
        assert_eq!(get_node_text(name, source.as_bytes()), "A");
    }
}
