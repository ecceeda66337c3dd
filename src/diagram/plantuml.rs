//! PlantUML class diagrams

use super::{DiagramFormat, DiagramOptions, DiagramRenderer, Selection, visible_methods};
use crate::types::{ClassInfo, ModuleInfo, ProjectModel};

pub struct PlantUmlRenderer;

impl PlantUmlRenderer {
    fn render_class(lines: &mut Vec<String>, class: &ClassInfo, public_only: bool) {
        lines.push(format!("class {} {{", class.name));
        for method in visible_methods(class, public_only) {
            lines.push(format!("    + {}()", method.name));
        }
        lines.push("}".to_string());
        lines.push(String::new());
    }

    /// Modules keyed by path, in order of first appearance
    fn group_by_module<'a>(
        selection: &Selection<'a>,
    ) -> Vec<(&'a ModuleInfo, Vec<&'a ClassInfo>)> {
        let mut groups: Vec<(&ModuleInfo, Vec<&ClassInfo>)> = Vec::new();
        for &(module, class) in &selection.classes {
            match groups.iter_mut().find(|(m, _)| m.path == module.path) {
                Some((_, classes)) => classes.push(class),
                None => groups.push((module, vec![class])),
            }
        }
        groups
    }
}

impl DiagramRenderer for PlantUmlRenderer {
    fn render(&self, project: &ProjectModel, options: &DiagramOptions) -> String {
        let selection = Selection::new(project, options.max_classes);
        let mut lines = vec!["@startuml".to_string(), String::new()];

        if options.group_by_module {
            for (module, classes) in Self::group_by_module(&selection) {
                lines.push(format!("package \"{}\" {{", module.package_name()));
                for class in classes {
                    Self::render_class(&mut lines, class, options.public_only);
                }
                lines.push("}".to_string());
                lines.push(String::new());
            }
        } else {
            for (_, class) in &selection.classes {
                Self::render_class(&mut lines, class, options.public_only);
            }
        }

        if !options.show_relations {
            lines.push("@enduml".to_string());
            return lines.join("\n");
        }

        for (child, parent) in selection.inheritance() {
            lines.push(format!("{} --|> {}", child, parent));
        }

        for (owner, kind, target, label) in selection.relations() {
            if label.is_empty() {
                lines.push(format!("{} {} {}", owner, kind.arrow(), target));
            } else {
                lines.push(format!("{} {} {} : \"{}\"", owner, kind.arrow(), target, label));
            }
        }

        lines.push(String::new());
        lines.push("@enduml".to_string());
        lines.join("\n")
    }

    fn format(&self) -> DiagramFormat {
        DiagramFormat::PlantUml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::fixtures::three_classes;

    fn render(options: DiagramOptions) -> String {
        PlantUmlRenderer.render(&three_classes(), &options)
    }

    #[test]
    fn test_full_render() {
        let output = render(DiagramOptions::default());

        assert!(output.starts_with("@startuml\n\n"));
        assert!(output.ends_with("\n\n@enduml"));
        assert!(output.contains("class A {\n    + pub()\n    + run()\n}"));
        assert!(output.contains("B --|> A"));
        assert!(output.contains("C --|> A"));
        assert!(output.contains("A *-- B : \"b\""));
        assert!(output.contains("A o-- C : \"c\""));
    }

    #[test]
    fn test_public_only_filter() {
        let output = render(DiagramOptions::default());
        assert!(output.contains("+ pub()"));
        assert!(!output.contains("_private"));
        assert!(!output.contains("__dunder__"));

        let all = render(DiagramOptions {
            public_only: false,
            ..DiagramOptions::default()
        });
        assert!(all.contains("+ _private()"));
        assert!(all.contains("+ __dunder__()"));
    }

    #[test]
    fn test_limit_excludes_edges_to_unselected() {
        let output = render(DiagramOptions {
            max_classes: 2,
            ..DiagramOptions::default()
        });

        assert!(!output.contains("class C"));
        assert!(!output.contains("C --|>"));
        assert!(!output.contains("o-- C"));
        assert!(output.contains("B --|> A"));
        assert!(output.contains("A *-- B : \"b\""));
    }

    #[test]
    fn test_grouping_wraps_modules() {
        let output = render(DiagramOptions {
            group_by_module: true,
            ..DiagramOptions::default()
        });

        let models = output.find("package \"models\" {").unwrap();
        let services = output.find("package \"services\" {").unwrap();
        assert!(models < services);
        assert!(output.find("class C {").unwrap() < services);
    }

    #[test]
    fn test_without_relations() {
        let output = render(DiagramOptions {
            show_relations: false,
            ..DiagramOptions::default()
        });

        assert!(output.ends_with("}\n\n@enduml"));
        assert!(!output.contains("--|>"));
        assert!(!output.contains("*--"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let first = render(DiagramOptions::default());
        let second = render(DiagramOptions::default());
        assert_eq!(first, second);
    }
}
