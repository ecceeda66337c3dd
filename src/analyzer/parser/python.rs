//! Structural extractor for Python sources
//!
//! A single pass over the syntax tree collects imports, top-level
//! functions, classes (flattened, nested classes become siblings), methods,
//! the `__init__` initializer, attributes, and composition/aggregation
//! edges inferred from annotations and constructor calls.
//!
//! Only statement containers are descended into. Definitions cannot appear
//! inside expressions, so expression subtrees are inspected on demand and
//! never walked by the visitor.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};
use tree_sitter::Node;

use super::expr::{canonical_text, expression_text, type_names, type_names_from_str};
use super::traits::{Extractor, find_syntax_error, get_node_text, node_line, parse_python};
use crate::analyzer::source::SourceLoader;
use crate::constants::extraction::{
    INITIALIZER_NAME, MAX_VISIT_DEPTH, PRIMITIVE_TYPES, SELF_NAME,
};
use crate::types::{
    AttributeInfo, ClassInfo, CompositionInfo, FunctionInfo, ModuleError, ModuleErrorKind,
    ModuleInfo, RelationKind,
};

/// Extracts a [`ModuleInfo`] from Python source
#[derive(Debug, Clone, Copy)]
pub struct PythonExtractor {
    loader: SourceLoader,
    max_depth: usize,
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self {
            loader: SourceLoader::default(),
            max_depth: MAX_VISIT_DEPTH,
        }
    }
}

impl PythonExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(mut self, loader: SourceLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Statement nesting beyond this marks the module as too deep
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Extract from already-decoded text. Never fails.
    pub fn extract_source(&self, path: &Path, source: &str) -> ModuleInfo {
        let tree = match parse_python(source) {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Parser unavailable for {}: {}", path.display(), e);
                return ModuleInfo::failed(
                    path,
                    ModuleError::new(ModuleErrorKind::Unhandled, e.to_string()),
                );
            }
        };

        if let Some(error) = find_syntax_error(&tree) {
            debug!("Syntax error in {}: {}", path.display(), error);
            return ModuleInfo::failed(path, error);
        }

        let mut visitor = ModuleVisitor::new(source.as_bytes(), self.max_depth);
        if visitor.visit(tree.root_node(), 0).is_err() {
            debug!("Nesting too deep in {}", path.display());
            return ModuleInfo::failed(
                path,
                ModuleError::new(
                    ModuleErrorKind::TooDeep,
                    format!("statement nesting exceeds {} levels", self.max_depth),
                ),
            );
        }

        visitor.into_module(path)
    }
}

impl Extractor for PythonExtractor {
    fn extract_file(&self, path: &Path) -> ModuleInfo {
        match self.loader.load(path) {
            Ok(source) => {
                if source.used_fallback {
                    debug!("Lossy UTF-8 decoding for {}", path.display());
                }
                let mut module = self.extract_source(path, &source.text);
                module.source = Some(source.info());
                module
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                ModuleInfo::failed(path, ModuleError::new(ModuleErrorKind::Io, e.to_string()))
            }
        }
    }
}

// =============================================================================
// Visitor
// =============================================================================

/// Depth guard tripped; aborts the whole module
struct DepthExceeded;

type Visit = std::result::Result<(), DepthExceeded>;

/// Traversal context for one module
struct ModuleVisitor<'s> {
    source: &'s [u8],
    max_depth: usize,

    imports: Vec<String>,
    functions: Vec<FunctionInfo>,
    classes: Vec<ClassInfo>,

    /// Indices into `classes` of the currently open class bodies
    class_stack: Vec<usize>,
    /// Names of the currently open callables, innermost last
    function_stack: Vec<String>,
    function_depth: usize,

    /// (class, attribute, is_instance)
    seen_attributes: HashSet<(String, String, bool)>,
    /// (owner, attribute, target, kind)
    seen_compositions: HashSet<(String, String, String, RelationKind)>,
}

impl<'s> ModuleVisitor<'s> {
    fn new(source: &'s [u8], max_depth: usize) -> Self {
        Self {
            source,
            max_depth,
            imports: Vec::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            class_stack: Vec::new(),
            function_stack: Vec::new(),
            function_depth: 0,
            seen_attributes: HashSet::new(),
            seen_compositions: HashSet::new(),
        }
    }

    fn into_module(self, path: &Path) -> ModuleInfo {
        let mut module = ModuleInfo::new(path).with_classes(self.classes);
        module.imports = self.imports;
        module.functions = self.functions;
        module
    }

    fn text(&self, node: Node) -> &'s str {
        get_node_text(node, self.source)
    }

    fn visit(&mut self, node: Node, depth: usize) -> Visit {
        if depth > self.max_depth {
            return Err(DepthExceeded);
        }

        match node.kind() {
            "import_statement" => self.visit_import(node),
            "import_from_statement" => self.visit_import_from(node),
            "future_import_statement" => self.visit_future_import(node),
            "class_definition" => return self.visit_class(node, depth),
            "function_definition" => return self.visit_function(node, Vec::new(), depth),
            "decorated_definition" => return self.visit_decorated(node, depth),
            "expression_statement" => self.visit_expression_statement(node),
            kind if is_statement_container(kind) => return self.visit_children(node, depth),
            _ => {}
        }
        Ok(())
    }

    fn visit_children(&mut self, node: Node, depth: usize) -> Visit {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, depth + 1)?;
        }
        Ok(())
    }

    fn visit_body(&mut self, node: Node, depth: usize) -> Visit {
        match node.child_by_field_name("body") {
            Some(body) => self.visit(body, depth + 1),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Imports
    // -------------------------------------------------------------------------

    fn visit_import(&mut self, node: Node) {
        let mut cursor = node.walk();
        let names: Vec<_> = node
            .children_by_field_name("name", &mut cursor)
            .map(|n| self.alias_parts(n))
            .collect();

        for (name, alias) in names {
            self.imports.push(match alias {
                Some(alias) => format!("import {} as {}", name, alias),
                None => format!("import {}", name),
            });
        }
    }

    fn visit_import_from(&mut self, node: Node) {
        let module = node
            .child_by_field_name("module_name")
            .map(|m| self.module_path(m))
            .unwrap_or_default();
        self.push_from_imports(node, &module);
    }

    fn visit_future_import(&mut self, node: Node) {
        self.push_from_imports(node, "__future__");
    }

    fn push_from_imports(&mut self, node: Node, module: &str) {
        let mut cursor = node.walk();
        let wildcard = node
            .named_children(&mut cursor)
            .any(|c| c.kind() == "wildcard_import");

        let names: Vec<(String, Option<String>)> = if wildcard {
            vec![("*".to_string(), None)]
        } else {
            node.children_by_field_name("name", &mut cursor)
                .map(|n| self.alias_parts(n))
                .collect()
        };

        for (name, alias) in names {
            self.imports.push(match alias {
                Some(alias) => format!("from {} import {} as {}", module, name, alias),
                None => format!("from {} import {}", module, name),
            });
        }
    }

    /// `a.b as c` → ("a.b", Some("c"))
    fn alias_parts(&self, node: Node) -> (String, Option<String>) {
        if node.kind() == "aliased_import" {
            let name = node
                .child_by_field_name("name")
                .map(|n| self.dotted_name(n))
                .unwrap_or_default();
            let alias = node
                .child_by_field_name("alias")
                .map(|a| self.text(a).to_string());
            (name, alias)
        } else {
            (self.dotted_name(node), None)
        }
    }

    /// Dotted names are rebuilt from their identifiers so `a . b` reads `a.b`
    fn dotted_name(&self, node: Node) -> String {
        if node.kind() != "dotted_name" {
            return self.text(node).to_string();
        }
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter(|c| c.kind() != "comment")
            .map(|c| self.text(c))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Relative imports keep their leading dots: `..pkg.mod`
    fn module_path(&self, node: Node) -> String {
        if node.kind() != "relative_import" {
            return self.dotted_name(node);
        }
        let mut path = String::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_prefix" => path.push_str(&".".repeat(self.text(child).matches('.').count())),
                "dotted_name" => path.push_str(&self.dotted_name(child)),
                _ => {}
            }
        }
        path
    }

    // -------------------------------------------------------------------------
    // Definitions
    // -------------------------------------------------------------------------

    fn visit_class(&mut self, node: Node, depth: usize) -> Visit {
        let Some(name) = node.child_by_field_name("name") else {
            return Ok(());
        };

        let bases = node
            .child_by_field_name("superclasses")
            .map(|args| self.base_texts(args))
            .unwrap_or_default();

        let mut class = ClassInfo::new(self.text(name)).with_bases(bases);
        class.lineno = Some(node_line(node));

        // Appended before the body is visited: nested classes land after it
        self.classes.push(class);
        self.class_stack.push(self.classes.len() - 1);
        let result = self.visit_body(node, depth);
        self.class_stack.pop();
        result
    }

    /// Positional bases only; `metaclass=` and `**kwargs` are not bases
    fn base_texts(&self, arguments: Node) -> Vec<String> {
        let mut cursor = arguments.walk();
        arguments
            .named_children(&mut cursor)
            .filter(|arg| {
                !matches!(
                    arg.kind(),
                    "keyword_argument" | "dictionary_splat" | "comment"
                )
            })
            .map(|arg| expression_text(arg, self.source))
            .collect()
    }

    fn visit_decorated(&mut self, node: Node, depth: usize) -> Visit {
        let mut cursor = node.walk();
        let decorators: Vec<String> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "decorator")
            .filter_map(|d| {
                let mut inner = d.walk();
                let expr = d
                    .named_children(&mut inner)
                    .find(|c| c.kind() != "comment");
                expr.map(|e| expression_text(e, self.source))
            })
            .collect();

        match node.child_by_field_name("definition") {
            Some(def) if def.kind() == "function_definition" => {
                self.visit_function(def, decorators, depth + 1)
            }
            Some(def) => self.visit(def, depth + 1),
            None => Ok(()),
        }
    }

    fn visit_function(&mut self, node: Node, decorators: Vec<String>, depth: usize) -> Visit {
        let Some(name_node) = node.child_by_field_name("name") else {
            return Ok(());
        };
        let name = self.text(name_node).to_string();

        let mut function = FunctionInfo::new(name.clone())
            .at_line(node_line(node))
            .with_decorators(decorators);
        function.is_async = node.child(0).is_some_and(|c| c.kind() == "async");
        self.record_function(function);

        // Every callable opens a scope, recorded or not
        self.function_stack.push(name);
        self.function_depth += 1;
        let result = self.visit_body(node, depth);
        self.function_depth -= 1;
        self.function_stack.pop();
        result
    }

    /// Any open class claims the function, however deeply it is nested
    /// inside other functions. Outside classes only depth-zero functions count.
    fn record_function(&mut self, function: FunctionInfo) {
        let in_top_level = self.function_depth == 0;
        match self.current_class_mut() {
            Some(class) if function.name == INITIALIZER_NAME => class.init = Some(function),
            Some(class) => class.methods.push(function),
            None if in_top_level => self.functions.push(function),
            None => {}
        }
    }

    fn current_class_mut(&mut self) -> Option<&mut ClassInfo> {
        let index = *self.class_stack.last()?;
        self.classes.get_mut(index)
    }

    // -------------------------------------------------------------------------
    // Attributes & compositions
    // -------------------------------------------------------------------------

    fn visit_expression_statement(&mut self, node: Node) {
        if self.class_stack.is_empty() {
            return;
        }
        let line = node_line(node);
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "assignment" {
                continue;
            }
            if child.child_by_field_name("type").is_some() {
                self.visit_annotated_assignment(child, line);
            } else {
                self.visit_plain_assignment(child, line);
            }
        }
    }

    /// `self.x: T = v` inside a callable, or `x: T = v` in the class body
    fn visit_annotated_assignment(&mut self, node: Node, line: usize) {
        let (Some(target), Some(annotation)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("type"),
        ) else {
            return;
        };
        let Some((name, is_instance)) = self.attribute_target(target) else {
            return;
        };

        let declared = expression_text(annotation, self.source);
        self.add_attribute(&name, Some(declared), line, is_instance);

        for target in type_names(annotation, self.source) {
            self.add_composition(&name, &target, line, RelationKind::Aggregation);
        }

        // Annotated and constructed: the call adds ownership on top of the reference
        let callee = node
            .child_by_field_name("right")
            .filter(|v| v.kind() == "call")
            .and_then(|call| call.child_by_field_name("function"));
        if let Some(callee) = callee {
            self.add_inferred_compositions(&name, callee, line);
        }
    }

    /// `a = b = Foo()`: every target is recorded; only calls infer a type
    fn visit_plain_assignment(&mut self, node: Node, line: usize) {
        let mut targets = Vec::new();
        let mut current = node;
        let value = loop {
            if let Some(left) = current.child_by_field_name("left") {
                targets.push(left);
            }
            match current.child_by_field_name("right") {
                Some(right)
                    if right.kind() == "assignment"
                        && right.child_by_field_name("type").is_none() =>
                {
                    current = right;
                }
                other => break other,
            }
        };

        let callee = value
            .filter(|v| v.kind() == "call")
            .and_then(|call| call.child_by_field_name("function"));
        let inferred = callee.map(|f| expression_text(f, self.source));

        for target in targets {
            let Some((name, is_instance)) = self.attribute_target(target) else {
                continue;
            };
            self.add_attribute(&name, inferred.clone(), line, is_instance);
            if let Some(callee) = callee {
                self.add_inferred_compositions(&name, callee, line);
            }
        }
    }

    /// Instance attribute inside a callable, class attribute outside one
    fn attribute_target(&self, target: Node) -> Option<(String, bool)> {
        if !self.function_stack.is_empty() {
            return self.self_attribute_name(target).map(|name| (name, true));
        }
        matches!(target.kind(), "identifier" | "keyword_identifier")
            .then(|| (self.text(target).to_string(), false))
    }

    /// `self.<attr>` → `attr`
    fn self_attribute_name(&self, target: Node) -> Option<String> {
        if target.kind() != "attribute" {
            return None;
        }
        let object = target.child_by_field_name("object")?;
        if object.kind() != "identifier" || self.text(object) != SELF_NAME {
            return None;
        }
        let attribute = target.child_by_field_name("attribute")?;
        Some(self.text(attribute).to_string())
    }

    /// Composition edges from the inferred type text of a constructor call
    fn add_inferred_compositions(&mut self, attribute: &str, callee: Node, line: usize) {
        let Some(inferred) = canonical_text(callee, self.source) else {
            return;
        };
        for target in type_names_from_str(&inferred) {
            self.add_composition(attribute, &target, line, RelationKind::Composition);
        }
    }

    /// First assignment wins
    fn add_attribute(
        &mut self,
        name: &str,
        type_name: Option<String>,
        line: usize,
        is_instance: bool,
    ) {
        let declared_in_init =
            is_instance && self.function_stack.last().is_some_and(|f| f == INITIALIZER_NAME);
        let Some(&index) = self.class_stack.last() else {
            return;
        };
        let Some(class) = self.classes.get_mut(index) else {
            return;
        };

        let key = (class.name.clone(), name.to_string(), is_instance);
        if !self.seen_attributes.insert(key) {
            return;
        }

        class.attributes.push(AttributeInfo {
            name: name.to_string(),
            type_name,
            lineno: Some(line),
            is_instance,
            declared_in_init,
        });
    }

    fn add_composition(&mut self, attribute: &str, target: &str, line: usize, kind: RelationKind) {
        if PRIMITIVE_TYPES.contains(&target) {
            return;
        }
        let Some(&index) = self.class_stack.last() else {
            return;
        };
        let Some(class) = self.classes.get_mut(index) else {
            return;
        };

        let key = (
            class.name.clone(),
            attribute.to_string(),
            target.to_string(),
            kind,
        );
        if !self.seen_compositions.insert(key) {
            return;
        }

        let mut edge = CompositionInfo::new(class.name.clone(), attribute, target, kind);
        edge.lineno = Some(line);
        class.compositions.push(edge);
    }
}

/// Statements whose children may hold definitions, imports or assignments
fn is_statement_container(kind: &str) -> bool {
    matches!(
        kind,
        "module"
            | "block"
            | "if_statement"
            | "elif_clause"
            | "else_clause"
            | "for_statement"
            | "while_statement"
            | "try_statement"
            | "except_clause"
            | "except_group_clause"
            | "finally_clause"
            | "with_statement"
            | "match_statement"
            | "case_clause"
    )
}
