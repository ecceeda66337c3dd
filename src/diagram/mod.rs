//! Class Diagram Rendering
//!
//! Deterministic serializers from a [`ProjectModel`] to diagram text.
//!
//! ## Shared Algorithm
//!
//! 1. Flatten classes across modules (module order, then definition order)
//! 2. With a class limit, keep the top-N by importance score
//!    (`2×methods + 3×bases + 3×compositions`, stable on ties)
//! 3. Only edges whose endpoints are both selected are drawn
//! 4. Edges are de-duplicated and emitted in sorted order
//!
//! ## Notations
//!
//! - [`PlantUmlRenderer`]: `@startuml`/`@enduml`, optional module packages
//! - [`MermaidRenderer`]: `classDiagram`, module grouping ignored

pub mod mermaid;
pub mod plantuml;

pub use mermaid::MermaidRenderer;
pub use plantuml::PlantUmlRenderer;

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::diagram::{BASE_WEIGHT, COMPOSITION_WEIGHT, METHOD_WEIGHT, UNIVERSAL_BASE};
use crate::types::{ClassInfo, FunctionInfo, ModuleInfo, ProjectModel, PyarchError, RelationKind};

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramOptions {
    /// Hide `_private` and `__dunder__` methods
    pub public_only: bool,
    /// Wrap classes in one package per module (PlantUML only)
    pub group_by_module: bool,
    pub show_relations: bool,
    /// Top-N class limit; 0 means unlimited
    pub max_classes: usize,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            public_only: true,
            group_by_module: false,
            show_relations: true,
            max_classes: 0,
        }
    }
}

/// Output notation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramFormat {
    #[default]
    PlantUml,
    Mermaid,
}

impl DiagramFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramFormat::PlantUml => "plantuml",
            DiagramFormat::Mermaid => "mermaid",
        }
    }

    pub fn renderer(&self) -> Box<dyn DiagramRenderer> {
        match self {
            DiagramFormat::PlantUml => Box::new(PlantUmlRenderer),
            DiagramFormat::Mermaid => Box::new(MermaidRenderer),
        }
    }
}

impl fmt::Display for DiagramFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramFormat {
    type Err = PyarchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plantuml" | "puml" => Ok(DiagramFormat::PlantUml),
            "mermaid" | "mmd" => Ok(DiagramFormat::Mermaid),
            _ => Err(PyarchError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Serializes a project model into one notation
pub trait DiagramRenderer {
    fn render(&self, project: &ProjectModel, options: &DiagramOptions) -> String;

    fn format(&self) -> DiagramFormat;
}

/// Render in the given notation
pub fn render_diagram(
    project: &ProjectModel,
    format: DiagramFormat,
    options: &DiagramOptions,
) -> String {
    format.renderer().render(project, options)
}

// =============================================================================
// Shared selection & edges
// =============================================================================

/// Classes chosen for rendering, with the name set that gates every edge
pub(crate) struct Selection<'a> {
    pub classes: Vec<(&'a ModuleInfo, &'a ClassInfo)>,
    names: HashSet<&'a str>,
}

impl<'a> Selection<'a> {
    pub fn new(project: &'a ProjectModel, max_classes: usize) -> Self {
        let mut classes: Vec<_> = project.classes().collect();
        if max_classes > 0 {
            // sort_by_key is stable: equal scores keep model order
            classes.sort_by_key(|(_, class)| std::cmp::Reverse(class_score(class)));
            classes.truncate(max_classes);
        }
        let names = classes.iter().map(|(_, c)| c.name.as_str()).collect();
        Self { classes, names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// (child, parent) pairs between selected classes
    pub fn inheritance(&self) -> BTreeSet<(String, String)> {
        let mut edges = BTreeSet::new();
        for (_, class) in &self.classes {
            for base in &class.bases {
                let parent = short_class_name(base);
                if parent.is_empty() || parent == UNIVERSAL_BASE || !self.contains(parent) {
                    continue;
                }
                edges.insert((class.name.clone(), parent.to_string()));
            }
        }
        edges
    }

    /// (owner, kind, target, label) between selected classes
    pub fn relations(&self) -> BTreeSet<(String, RelationKind, String, String)> {
        let mut edges = BTreeSet::new();
        for (_, class) in &self.classes {
            for relation in &class.compositions {
                let owner = if relation.owner.is_empty() {
                    class.name.as_str()
                } else {
                    relation.owner.as_str()
                };
                let target = short_class_name(&relation.target);
                if !self.contains(owner) || !self.contains(target) {
                    continue;
                }
                edges.insert((
                    owner.to_string(),
                    relation.kind,
                    target.to_string(),
                    relation.attribute.clone(),
                ));
            }
        }
        edges
    }
}

/// Importance score used for top-N selection
pub fn class_score(class: &ClassInfo) -> usize {
    class.methods.len() * METHOD_WEIGHT
        + class.bases.len() * BASE_WEIGHT
        + class.compositions.len() * COMPOSITION_WEIGHT
}

/// `pkg.mod.Base[T]` → `Base`
pub fn short_class_name(raw: &str) -> &str {
    let name = raw.trim();
    let name = name.split('[').next().unwrap_or(name);
    name.rsplit('.').next().unwrap_or(name)
}

pub(crate) fn visible_methods(
    class: &ClassInfo,
    public_only: bool,
) -> impl Iterator<Item = &FunctionInfo> {
    class
        .methods
        .iter()
        .filter(move |m| !public_only || m.is_public())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::{ClassInfo, CompositionInfo, ModuleInfo, ProjectModel, RelationKind};

    /// A ← B (inherits), A *-- B via `b`, C excluded when the limit is 2
    pub fn three_classes() -> ProjectModel {
        let a = ClassInfo::new("A")
            .with_methods(["pub", "_private", "__dunder__", "run"])
            .with_composition(CompositionInfo::new("A", "b", "B", RelationKind::Composition))
            .with_composition(CompositionInfo::new("A", "c", "C", RelationKind::Aggregation));
        let b = ClassInfo::new("B")
            .with_bases(["pkg.A"])
            .with_methods(["go"]);
        let c = ClassInfo::new("C").with_bases(["A"]);

        ProjectModel::new(vec![
            ModuleInfo::new("/src/app/models.py").with_classes(vec![a, c]),
            ModuleInfo::new("/src/app/services.py").with_classes(vec![b]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_class_name() {
        assert_eq!(short_class_name("pkg.mod.Base"), "Base");
        assert_eq!(short_class_name("typing.Generic[T]"), "Generic");
        assert_eq!(short_class_name("Dict[str, pkg.X]"), "Dict");
        assert_eq!(short_class_name("  Plain "), "Plain");
        assert_eq!(short_class_name(""), "");
    }

    #[test]
    fn test_class_score_weights() {
        let class = ClassInfo::new("X")
            .with_methods(["a", "b"])
            .with_bases(["Base"]);
        assert_eq!(class_score(&class), 2 * 2 + 3);
    }

    #[test]
    fn test_selection_top_n_is_stable() {
        let project = ProjectModel::new(vec![ModuleInfo::new("m.py").with_classes(vec![
            ClassInfo::new("Low"),
            ClassInfo::new("TieFirst").with_methods(["a"]),
            ClassInfo::new("High").with_methods(["a", "b", "c"]),
            ClassInfo::new("TieSecond").with_methods(["b"]),
        ])]);

        let selection = Selection::new(&project, 3);
        let names: Vec<_> = selection.classes.iter().map(|(_, c)| c.name.as_str()).collect();
        assert_eq!(names, vec!["High", "TieFirst", "TieSecond"]);
        assert!(!selection.contains("Low"));
    }

    #[test]
    fn test_zero_limit_keeps_model_order() {
        let project = fixtures::three_classes();
        let selection = Selection::new(&project, 0);
        let names: Vec<_> = selection.classes.iter().map(|(_, c)| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "B"]);
    }

    #[test]
    fn test_edges_are_gated_by_selection() {
        let project = fixtures::three_classes();
        let selection = Selection::new(&project, 2);

        assert!(selection.contains("A"));
        assert!(selection.contains("B"));
        assert!(!selection.contains("C"));

        let inheritance: Vec<_> = selection.inheritance().into_iter().collect();
        assert_eq!(inheritance, vec![("B".to_string(), "A".to_string())]);

        let relations = selection.relations();
        assert_eq!(relations.len(), 1);
        assert!(relations.iter().all(|(_, _, target, _)| target != "C"));
    }

    #[test]
    fn test_object_base_is_never_drawn() {
        let project = ProjectModel::new(vec![ModuleInfo::new("m.py").with_classes(vec![
            ClassInfo::new("object"),
            ClassInfo::new("A").with_bases(["object"]),
        ])]);
        assert!(Selection::new(&project, 0).inheritance().is_empty());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("plantuml".parse::<DiagramFormat>().unwrap(), DiagramFormat::PlantUml);
        assert_eq!("Mermaid".parse::<DiagramFormat>().unwrap(), DiagramFormat::Mermaid);
        assert!(matches!(
            "graphviz".parse::<DiagramFormat>(),
            Err(PyarchError::UnsupportedFormat(_))
        ));
        assert_eq!(DiagramFormat::Mermaid.to_string(), "mermaid");
    }

    #[test]
    fn test_empty_project_renders_markers() {
        let project = ProjectModel::default();
        let options = DiagramOptions::default();

        let puml = render_diagram(&project, DiagramFormat::PlantUml, &options);
        assert!(puml.starts_with("@startuml"));
        assert!(puml.ends_with("@enduml"));

        let mermaid = render_diagram(&project, DiagramFormat::Mermaid, &options);
        assert_eq!(mermaid, "classDiagram");
    }
}
