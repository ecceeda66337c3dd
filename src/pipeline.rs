//! End-to-end analysis of a local project directory
//!
//! scan → extract/aggregate → tech stack (optional) → diagram

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::analyzer::{FileScanner, ProjectAnalyzer, PythonExtractor, ScanResult, SourceLoader};
use crate::config::{Config, DiagramConfig};
use crate::diagram::{DiagramFormat, render_diagram};
use crate::techstack::{TechStackAnalyzer, TechStackReport};
use crate::types::{ProjectModel, ProjectSummary, Result};

/// Options the report was produced with
#[derive(Debug, Clone, Serialize)]
pub struct ReportOptions {
    pub include_tech_stack: bool,
    pub max_file_size: u64,
    pub diagram: DiagramConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub project_path: PathBuf,
    pub generated_at_utc: DateTime<Utc>,
    pub options: ReportOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagramOutput {
    pub format: DiagramFormat,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub meta: ReportMeta,
    pub scan: ScanResult,
    pub summary: ProjectSummary,
    pub project_model: ProjectModel,
    pub tech_stack: Option<TechStackReport>,
    pub diagram: DiagramOutput,
}

/// Analyze every Python file under `root`.
///
/// Only an unusable root fails; per-file problems are recorded on the
/// affected modules.
pub fn analyze_local_project(root: &Path, config: &Config) -> Result<AnalysisReport> {
    let scan = FileScanner::new(root)
        .with_exclude(config.analysis.exclude.clone())
        .respect_gitignore(config.analysis.respect_gitignore)
        .scan()?;
    info!(
        "Found {} Python files under {}",
        scan.python_files.len(),
        scan.root.display()
    );

    let extractor = PythonExtractor::new()
        .with_loader(SourceLoader::new().with_max_bytes(config.analysis.max_file_size));
    let project_model = ProjectAnalyzer::new(extractor).analyze_scan(&scan);

    let tech_stack = config
        .tech_stack
        .enabled
        .then(|| TechStackAnalyzer::new().analyze(&project_model));

    let format = config.diagram.format;
    let text = render_diagram(&project_model, format, &config.diagram.options());

    Ok(AnalysisReport {
        meta: ReportMeta {
            project_path: scan.root.clone(),
            generated_at_utc: Utc::now(),
            options: ReportOptions {
                include_tech_stack: config.tech_stack.enabled,
                max_file_size: config.analysis.max_file_size,
                diagram: config.diagram.clone(),
            },
        },
        summary: project_model.summary(),
        scan,
        project_model,
        tech_stack,
        diagram: DiagramOutput { format, text },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PyarchError;
    use std::fs;
    use tempfile::TempDir;

    fn sample_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("app");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join("models.py"),
            "class Repo:\n    def get(self): ...\n\nclass Service:\n    def __init__(self):\n        self.repo = Repo()\n",
        )
        .unwrap();
        fs::write(pkg.join("broken.py"), "def oops(:\n").unwrap();
        fs::write(pkg.join("api.py"), "from fastapi import FastAPI\napp = FastAPI()\n").unwrap();
        fs::write(dir.path().join("requirements.txt"), "fastapi\nuvicorn\n").unwrap();
        dir
    }

    #[test]
    fn test_full_report() {
        let dir = sample_project();
        let report = analyze_local_project(dir.path(), &Config::default()).unwrap();

        assert_eq!(report.scan.python_files.len(), 3);
        assert_eq!(report.summary.modules, 3);
        assert_eq!(report.summary.classes, 2);
        assert_eq!(report.summary.failed_modules, 1);

        let text = &report.diagram.text;
        assert!(text.starts_with("@startuml"));
        assert!(text.contains("package \"models\" {"));
        assert!(text.contains("Service *-- Repo : \"repo\""));

        let tech = report.tech_stack.unwrap();
        assert_eq!(tech.frameworks, vec!["fastapi"]);
        assert!(report.project_model.requirements_path.is_some());
    }

    #[test]
    fn test_mermaid_without_tech_stack() {
        let dir = sample_project();
        let mut config = Config::default();
        config.diagram.format = DiagramFormat::Mermaid;
        config.tech_stack.enabled = false;

        let report = analyze_local_project(dir.path(), &config).unwrap();
        assert!(report.tech_stack.is_none());
        assert!(report.diagram.text.starts_with("classDiagram"));
        assert_eq!(report.diagram.format, DiagramFormat::Mermaid);
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = analyze_local_project(&dir.path().join("nope"), &Config::default()).unwrap_err();
        assert!(matches!(err, PyarchError::InvalidRoot(_)));
    }

    #[test]
    fn test_report_serializes() {
        let dir = sample_project();
        let report = analyze_local_project(dir.path(), &Config::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["diagram"]["format"], "plantuml");
        assert_eq!(json["meta"]["options"]["diagram"]["max_classes"], 40);
        assert!(json["meta"]["generated_at_utc"].is_string());
        assert_eq!(json["summary"]["classes"], 2);
    }
}
