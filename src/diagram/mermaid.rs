//! Mermaid class diagrams
//!
//! Mermaid has no package blocks for class diagrams, so module grouping is
//! accepted and ignored.

use super::{DiagramFormat, DiagramOptions, DiagramRenderer, Selection, visible_methods};
use crate::types::ProjectModel;

pub struct MermaidRenderer;

impl DiagramRenderer for MermaidRenderer {
    fn render(&self, project: &ProjectModel, options: &DiagramOptions) -> String {
        let selection = Selection::new(project, options.max_classes);
        let mut lines = vec!["classDiagram".to_string()];

        for (_, class) in &selection.classes {
            lines.push(format!("class {}", class.name));
            for method in visible_methods(class, options.public_only) {
                lines.push(format!("{} : +{}()", class.name, method.name));
            }
        }

        if !options.show_relations {
            return lines.join("\n");
        }

        for (child, parent) in selection.inheritance() {
            lines.push(format!("{} <|-- {}", parent, child));
        }

        for (owner, kind, target, label) in selection.relations() {
            if label.is_empty() {
                lines.push(format!("{} {} {}", owner, kind.arrow(), target));
            } else {
                lines.push(format!("{} {} {} : {}", owner, kind.arrow(), target, label));
            }
        }

        lines.join("\n")
    }

    fn format(&self) -> DiagramFormat {
        DiagramFormat::Mermaid
    }
}
