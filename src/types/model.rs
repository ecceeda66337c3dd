//! Structural model of an analyzed Python project
//!
//! Modules, classes, functions, attributes and composition relations as
//! reconstructed from syntax alone. Collections are append-only while a
//! module is being extracted and are not touched afterwards.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// =============================================================================
// Functions & Attributes
// =============================================================================

/// A function, method or designated initializer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    /// 1-based line of the `def` keyword (decorators are not counted)
    pub lineno: Option<usize>,
    /// Decorator expressions in source order, without the leading `@`
    pub decorators: Vec<String>,
    #[serde(default)]
    pub is_async: bool,
}

impl FunctionInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lineno: None,
            decorators: Vec::new(),
            is_async: false,
        }
    }

    pub fn at_line(mut self, lineno: usize) -> Self {
        self.lineno = Some(lineno);
        self
    }

    pub fn with_decorators(mut self, decorators: Vec<String>) -> Self {
        self.decorators = decorators;
        self
    }

    /// Conventionally private (`_x`) or dunder (`__x__`) names are not public
    pub fn is_public(&self) -> bool {
        is_public_name(&self.name)
    }
}

/// Class-level or instance-level attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    /// Declared (annotation) or inferred (constructor call) type text
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub lineno: Option<usize>,
    /// `self.x` (true) vs. class body `x` (false)
    pub is_instance: bool,
    /// Instance attribute first observed inside `__init__`
    pub declared_in_init: bool,
}

// =============================================================================
// Relations
// =============================================================================

/// How a composition edge was discovered
///
/// Ordering matters for rendering: composition sorts before aggregation,
/// matching the lexical order of their arrows (`*--` < `o--`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Target constructed/assigned directly (ownership)
    Composition,
    /// Target only named by a type annotation (reference)
    Aggregation,
}

impl RelationKind {
    /// Class-diagram arrow shared by PlantUML and Mermaid
    pub fn arrow(&self) -> &'static str {
        match self {
            RelationKind::Composition => "*--",
            RelationKind::Aggregation => "o--",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::Composition => write!(f, "composition"),
            RelationKind::Aggregation => write!(f, "aggregation"),
        }
    }
}

/// "A has a field of type B"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionInfo {
    pub owner: String,
    pub attribute: String,
    pub target: String,
    pub lineno: Option<usize>,
    pub kind: RelationKind,
}

impl CompositionInfo {
    pub fn new(
        owner: impl Into<String>,
        attribute: impl Into<String>,
        target: impl Into<String>,
        kind: RelationKind,
    ) -> Self {
        Self {
            owner: owner.into(),
            attribute: attribute.into(),
            target: target.into(),
            lineno: None,
            kind,
        }
    }
}

// =============================================================================
// Classes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    /// Base-class expressions as text; may be qualified (`abc.ABC`) or generic (`Generic[T]`)
    pub bases: Vec<String>,
    /// `__init__`, tracked apart from `methods`
    pub init: Option<FunctionInfo>,
    /// Every other method, in definition order
    pub methods: Vec<FunctionInfo>,
    pub attributes: Vec<AttributeInfo>,
    pub compositions: Vec<CompositionInfo>,
    pub lineno: Option<usize>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            init: None,
            methods: Vec::new(),
            attributes: Vec::new(),
            compositions: Vec::new(),
            lineno: None,
        }
    }

    pub fn with_bases<I, S>(mut self, bases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bases = bases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_methods<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = names.into_iter().map(FunctionInfo::new).collect();
        self
    }

    pub fn with_composition(mut self, composition: CompositionInfo) -> Self {
        self.compositions.push(composition);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

// =============================================================================
// Modules
// =============================================================================

/// Why a module ended up empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleErrorKind {
    /// Source text is not valid Python
    Syntax,
    /// File could not be read
    Io,
    /// Syntax tree nested deeper than the visitor allows
    TooDeep,
    /// Extraction itself failed unexpectedly
    Unhandled,
}

impl fmt::Display for ModuleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax error"),
            Self::Io => write!(f, "io error"),
            Self::TooDeep => write!(f, "nesting too deep"),
            Self::Unhandled => write!(f, "unhandled error"),
        }
    }
}

/// Per-module failure metadata. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleError {
    pub kind: ModuleErrorKind,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ModuleError {
    pub fn new(kind: ModuleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind: ModuleErrorKind::Syntax,
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(col)) => {
                write!(f, "{}: {} (line {}, column {})", self.kind, self.message, line, col)
            }
            (Some(line), None) => write!(f, "{}: {} (line {})", self.kind, self.message, line),
            _ => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// How the source text was decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub encoding: String,
    pub used_fallback: bool,
    pub truncated: bool,
}

/// One Python source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub path: PathBuf,
    /// Canonical import lines (`import a as b`, `from .x import y`), in source order
    pub imports: Vec<String>,
    /// Zero-nesting-depth functions only
    pub functions: Vec<FunctionInfo>,
    /// Flat list: nested classes are siblings of their enclosing class
    pub classes: Vec<ClassInfo>,
    pub source: Option<SourceInfo>,
    /// Set only when extraction failed; the collections are then empty
    pub error: Option<ModuleError>,
}

impl ModuleInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            imports: Vec::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            source: None,
            error: None,
        }
    }

    /// An empty module carrying failure metadata
    pub fn failed(path: impl Into<PathBuf>, error: ModuleError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(path)
        }
    }

    pub fn with_classes(mut self, classes: Vec<ClassInfo>) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports = imports.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// File stem, used as the package name in grouped diagrams
    pub fn package_name(&self) -> String {
        module_stem(&self.path)
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.name == name)
    }
}

fn module_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// =============================================================================
// Project
// =============================================================================

/// Aggregated analysis result for a whole project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectModel {
    /// Modules in input path order
    pub modules: Vec<ModuleInfo>,
    pub root_path: Option<PathBuf>,
    pub requirements_path: Option<PathBuf>,
    pub pyproject_path: Option<PathBuf>,
    pub setup_cfg_path: Option<PathBuf>,
}

/// Counts used in reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub modules: usize,
    pub classes: usize,
    pub functions: usize,
    pub methods: usize,
    pub imports: usize,
    pub failed_modules: usize,
}

impl ProjectModel {
    pub fn new(modules: Vec<ModuleInfo>) -> Self {
        Self {
            modules,
            ..Self::default()
        }
    }

    /// Every class with its owning module, in module order then definition order
    pub fn classes(&self) -> impl Iterator<Item = (&ModuleInfo, &ClassInfo)> {
        self.modules
            .iter()
            .flat_map(|m| m.classes.iter().map(move |c| (m, c)))
    }

    pub fn summary(&self) -> ProjectSummary {
        let mut summary = ProjectSummary {
            modules: self.modules.len(),
            ..ProjectSummary::default()
        };
        for module in &self.modules {
            summary.classes += module.classes.len();
            summary.functions += module.functions.len();
            summary.imports += module.imports.len();
            summary.methods += module.classes.iter().map(|c| c.methods.len()).sum::<usize>();
            if module.has_error() {
                summary.failed_modules += 1;
            }
        }
        summary
    }
}

/// Public means non-empty and not starting with an underscore
pub fn is_public_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('_')
}
