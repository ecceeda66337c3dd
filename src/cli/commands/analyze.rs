//! Analyze Command
//!
//! Extracts the class structure of a Python project and prints a class
//! diagram (or the full JSON report).
//!
//! Usage:
//!   pyarch analyze [PATH] [--format plantuml|mermaid] [--max-classes N]
//!                  [--public-only] [--no-group] [--no-relations]
//!                  [--no-tech-stack] [--json] [--output FILE]

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Output;
use crate::config::{Config, ConfigLoader};
use crate::diagram::DiagramFormat;
use crate::pipeline::{AnalysisReport, analyze_local_project};
use crate::types::Result;

/// Command-line overrides; `None`/`false` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub format: Option<DiagramFormat>,
    pub max_classes: Option<usize>,
    pub public_only: bool,
    pub no_group: bool,
    pub no_relations: bool,
    pub no_tech_stack: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
}

impl AnalyzeOptions {
    fn apply(&self, config: &mut Config) {
        if let Some(format) = self.format {
            config.diagram.format = format;
        }
        if let Some(max_classes) = self.max_classes {
            config.diagram.max_classes = max_classes;
        }
        if self.public_only {
            config.diagram.public_only = true;
        }
        if self.no_group {
            config.diagram.group_by_module = false;
        }
        if self.no_relations {
            config.diagram.show_relations = false;
        }
        if self.no_tech_stack {
            config.tech_stack.enabled = false;
        }
    }
}

pub fn run(path: Option<PathBuf>, options: AnalyzeOptions) -> Result<()> {
    let root = path.unwrap_or_else(|| PathBuf::from("."));
    let mut config = ConfigLoader::load_for(&root)?;
    options.apply(&mut config);

    let report = analyze_local_project(&root, &config)?;
    let body = if options.json {
        serde_json::to_string_pretty(&report)?
    } else {
        report.diagram.text.clone()
    };

    let ui = Output::new();
    match &options.output {
        Some(file) => {
            write_output(file, &body)?;
            ui.success(&format!("Wrote {}", file.display()));
        }
        None => println!("{}", body),
    }

    print_summary(&ui, &report);
    Ok(())
}

fn write_output(file: &Path, body: &str) -> Result<()> {
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(file, format!("{}\n", body))?;
    Ok(())
}

fn print_summary(ui: &Output, report: &AnalysisReport) {
    let summary = &report.summary;
    if summary.modules == 0 {
        ui.info(&format!(
            "No Python files found under {}",
            report.meta.project_path.display()
        ));
        return;
    }

    ui.section("Summary");
    ui.field("modules", summary.modules);
    ui.field("classes", summary.classes);
    ui.field("functions", summary.functions);
    ui.field("methods", summary.methods);
    ui.field("imports", summary.imports);

    if let Some(tech) = &report.tech_stack {
        ui.field(
            "project",
            format!("{} ({:.0}% confidence)", tech.project_type, tech.confidence * 100.0),
        );
        if !tech.frameworks.is_empty() {
            ui.field("frameworks", tech.frameworks.join(", "));
        }
    }

    if summary.failed_modules > 0 {
        ui.warning(&format!(
            "{} module(s) could not be analyzed:",
            summary.failed_modules
        ));
        for module in report.project_model.modules.iter().filter(|m| m.has_error()) {
            if let Some(error) = &module.error {
                eprintln!("    {}: {}", module.path.display(), error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let mut config = Config::default();
        AnalyzeOptions {
            format: Some(DiagramFormat::Mermaid),
            max_classes: Some(0),
            no_group: true,
            no_tech_stack: true,
            ..AnalyzeOptions::default()
        }
        .apply(&mut config);

        assert_eq!(config.diagram.format, DiagramFormat::Mermaid);
        assert_eq!(config.diagram.max_classes, 0);
        assert!(!config.diagram.group_by_module);
        assert!(config.diagram.show_relations);
        assert!(!config.tech_stack.enabled);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = Config::default();
        AnalyzeOptions::default().apply(&mut config);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_write_output_creates_parent() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("out/diagram.puml");
        write_output(&file, "@startuml\n@enduml").unwrap();
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "@startuml\n@enduml\n"
        );
    }
}
