//! Tech-Stack Classifier
//!
//! Guesses what kind of project this is from the packages it uses.
//!
//! ## Signals
//!
//! - Import lines of every analyzed module (top-level package only)
//! - `requirements.txt`
//! - `pyproject.toml` dependency groups (Poetry and PEP 621)
//!
//! Standard-library modules and repository-local namespaces (`tests`,
//! `docs`, ...) are filtered out before scoring.
//!
//! ## Scoring
//!
//! | Bucket | Per hit | Bonus |
//! |--------|---------|-------|
//! | web | 4.0 per framework, 0.5 per related package | 2.0 with a server runtime |
//! | ml | 1.5 | 2.0 with torch/tensorflow/jax |
//! | scientific | 1.0 | 1.0 with numpy/scipy |
//! | cli | 1.2 | 4.0 with declared console scripts |
//!
//! The best bucket wins (ties go to the earlier row); confidence is
//! `min(1, 0.25 × margin over the runner-up)`.

pub mod manifest;
pub mod rules;
pub mod stdlib;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::tech_stack::{
    CLI_SCRIPTS_BONUS, CLI_WEIGHT, CONFIDENCE_PER_MARGIN, ML_FRAMEWORK_BONUS, ML_WEIGHT,
    SCIENTIFIC_CORE_BONUS, SCIENTIFIC_WEIGHT, WEB_FRAMEWORK_WEIGHT, WEB_RELATED_WEIGHT,
    WEB_RUNTIME_BONUS,
};
use crate::types::ProjectModel;
use manifest::{BuildManifest, detect_pyproject_path, import_packages, parse_requirements};
use rules::{
    CLI_CORE, ML_CORE, ML_FRAMEWORKS, SCIENTIFIC_CORE, SCIENTIFIC_FOUNDATIONS, WEB_FRAMEWORKS,
    WEB_RELATED, WEB_RUNTIME, category_for, hits,
};
use stdlib::is_third_party;

// =============================================================================
// Report Types
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Web,
    Ml,
    Cli,
    Scientific,
    #[default]
    Unknown,
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Web => write!(f, "web"),
            Self::Ml => write!(f, "ml"),
            Self::Cli => write!(f, "cli"),
            Self::Scientific => write!(f, "scientific"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Pip,
    Poetry,
    Pyproject,
    Mixed,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeScores {
    pub web: f64,
    pub ml: f64,
    pub cli: f64,
    pub scientific: f64,
}

impl TypeScores {
    /// Buckets in tie-break order
    fn ranked(&self) -> [(ProjectType, f64); 4] {
        [
            (ProjectType::Web, self.web),
            (ProjectType::Ml, self.ml),
            (ProjectType::Cli, self.cli),
            (ProjectType::Scientific, self.scientific),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PythonInfo {
    pub constraint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPackages {
    pub runtime: Vec<String>,
    pub dev: Vec<String>,
    pub optional: Vec<String>,
}

/// Packages per source, before filtering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSources {
    pub imports: Vec<String>,
    pub requirements_txt: Vec<String>,
    pub pyproject: ManifestPackages,
}

/// Which rules fired
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    pub has_pyproject: bool,
    pub console_scripts: Vec<String>,
    pub frameworks_detected: Vec<String>,
    pub web_runtime_detected: Vec<String>,
    pub web_related_hits: Vec<String>,
    pub ml_hits: Vec<String>,
    pub scientific_hits: Vec<String>,
    pub cli_hits: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechStackDetails {
    pub python: PythonInfo,
    pub package_manager: PackageManager,
    pub frameworks: Vec<String>,
    /// Category → sorted packages; categories sorted by name
    pub categories: BTreeMap<String, Vec<String>>,
    pub all_packages: Vec<String>,
    pub sources: PackageSources,
    pub signals: Signals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechStackReport {
    pub project_type: ProjectType,
    pub confidence: f64,
    pub type_scores: TypeScores,
    pub tech_stack: TechStackDetails,

    // Flat fields kept for older consumers
    /// Detected web frameworks
    pub frameworks: Vec<String>,
    /// Every other detected package
    pub libraries: Vec<String>,
    /// Raw import lines of all modules, in module order
    pub imports: Vec<String>,
}

// =============================================================================
// Analyzer
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct TechStackAnalyzer;

impl TechStackAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, project: &ProjectModel) -> TechStackReport {
        let raw_imports: Vec<String> = project
            .modules
            .iter()
            .flat_map(|m| m.imports.iter().cloned())
            .collect();
        let imported: BTreeSet<String> = import_packages(&raw_imports).collect();

        let requirements: BTreeSet<String> = project
            .requirements_path
            .as_deref()
            .map(parse_requirements)
            .unwrap_or_default()
            .into_iter()
            .collect();

        let pyproject_path = detect_pyproject_path(project);
        let manifest = pyproject_path
            .as_deref()
            .map(BuildManifest::load)
            .unwrap_or_default();

        let all_packages: BTreeSet<String> = imported
            .iter()
            .chain(&requirements)
            .chain(manifest.runtime.keys())
            .chain(manifest.dev.keys())
            .chain(manifest.optional.keys())
            .filter(|p| is_third_party(p))
            .cloned()
            .collect();

        let frameworks = hits(&all_packages, WEB_FRAMEWORKS);
        let package_manager = package_manager(!requirements.is_empty(), &manifest);

        let mut categories: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for package in &all_packages {
            categories
                .entry(category_for(package).to_string())
                .or_default()
                .insert(package.clone());
        }
        // Manifest dev dependencies are always listed as dev, whatever they are
        for package in manifest.dev.keys() {
            categories
                .entry("dev".to_string())
                .or_default()
                .insert(package.clone());
        }

        let (project_type, type_scores, confidence) = classify(&all_packages, &manifest);
        let signals = Signals {
            has_pyproject: pyproject_path.is_some(),
            console_scripts: manifest.scripts.keys().cloned().collect(),
            frameworks_detected: frameworks.clone(),
            web_runtime_detected: hits(&all_packages, WEB_RUNTIME),
            web_related_hits: hits(&all_packages, WEB_RELATED),
            ml_hits: hits(&all_packages, ML_CORE),
            scientific_hits: hits(&all_packages, SCIENTIFIC_CORE),
            cli_hits: hits(&all_packages, CLI_CORE),
        };

        debug!(
            "Tech stack: {} (confidence {:.2}, {} packages)",
            project_type,
            confidence,
            all_packages.len()
        );

        let libraries = all_packages
            .iter()
            .filter(|p| !WEB_FRAMEWORKS.contains(&p.as_str()))
            .cloned()
            .collect();

        TechStackReport {
            project_type,
            confidence,
            type_scores,
            tech_stack: TechStackDetails {
                python: PythonInfo {
                    constraint: manifest.python_constraint.clone(),
                },
                package_manager,
                frameworks: frameworks.clone(),
                categories: categories
                    .into_iter()
                    .map(|(k, v)| (k, v.into_iter().collect()))
                    .collect(),
                all_packages: all_packages.iter().cloned().collect(),
                sources: PackageSources {
                    imports: imported.into_iter().collect(),
                    requirements_txt: requirements.into_iter().collect(),
                    pyproject: ManifestPackages {
                        runtime: manifest.runtime.keys().cloned().collect(),
                        dev: manifest.dev.keys().cloned().collect(),
                        optional: manifest.optional.keys().cloned().collect(),
                    },
                },
                signals,
            },
            frameworks,
            libraries,
            imports: raw_imports,
        }
    }
}

fn package_manager(has_requirements: bool, manifest: &BuildManifest) -> PackageManager {
    let has_manifest = manifest.has_dependencies();
    match (has_manifest, has_requirements) {
        (true, true) => PackageManager::Mixed,
        (true, false) if manifest.style.poetry => PackageManager::Poetry,
        (true, false) => PackageManager::Pyproject,
        (false, true) => PackageManager::Pip,
        (false, false) => PackageManager::Unknown,
    }
}

fn classify(packages: &BTreeSet<String>, manifest: &BuildManifest) -> (ProjectType, TypeScores, f64) {
    let count = |set: &[&str]| hits(packages, set).len() as f64;
    let any = |set: &[&str]| count(set) > 0.0;

    let mut scores = TypeScores::default();

    scores.web += WEB_FRAMEWORK_WEIGHT * count(WEB_FRAMEWORKS);
    if any(WEB_RUNTIME) {
        scores.web += WEB_RUNTIME_BONUS;
    }
    scores.web += WEB_RELATED_WEIGHT * count(WEB_RELATED);

    scores.ml += ML_WEIGHT * count(ML_CORE);
    if any(ML_FRAMEWORKS) {
        scores.ml += ML_FRAMEWORK_BONUS;
    }

    scores.scientific += SCIENTIFIC_WEIGHT * count(SCIENTIFIC_CORE);
    if any(SCIENTIFIC_FOUNDATIONS) {
        scores.scientific += SCIENTIFIC_CORE_BONUS;
    }

    scores.cli += CLI_WEIGHT * count(CLI_CORE);
    if !manifest.scripts.is_empty() {
        scores.cli += CLI_SCRIPTS_BONUS;
    }

    let ranked = scores.ranked();
    // First maximum wins, so ties keep bucket order
    let (best_type, best) = ranked
        .iter()
        .copied()
        .fold((ProjectType::Unknown, f64::NEG_INFINITY), |acc, (t, s)| {
            if s > acc.1 { (t, s) } else { acc }
        });

    let mut sorted: Vec<f64> = ranked.iter().map(|(_, s)| *s).collect();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let second = sorted.get(1).copied().unwrap_or(0.0);

    if best <= 0.0 {
        return (ProjectType::Unknown, scores, 0.0);
    }
    let margin = (best - second).max(0.0);
    let confidence = (CONFIDENCE_PER_MARGIN * margin).min(1.0);
    (best_type, scores, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModuleInfo;
    use tempfile::TempDir;

    fn project_with_imports(imports: &[&str]) -> ProjectModel {
        ProjectModel::new(vec![ModuleInfo::new("app.py").with_imports(imports.iter().copied())])
    }

    #[test]
    fn test_web_project_from_imports() {
        let project = project_with_imports(&[
            "import os",
            "import sys",
            "from pathlib import Path",
            "from fastapi import FastAPI",
            "from .models import User",
        ]);
        let report = TechStackAnalyzer::new().analyze(&project);

        assert_eq!(report.project_type, ProjectType::Web);
        assert_eq!(report.frameworks, vec!["fastapi"]);
        assert!(report.libraries.is_empty());
        assert!(!report.tech_stack.all_packages.contains(&"os".to_string()));
        assert!(!report.tech_stack.all_packages.contains(&"pathlib".to_string()));
        assert_eq!(report.imports.len(), 5);
        assert_eq!(report.type_scores.web, 4.0);
        assert_eq!(report.confidence, 1.0);
        assert_eq!(
            report.tech_stack.categories.get("framework:web"),
            Some(&vec!["fastapi".to_string()])
        );
    }

    #[test]
    fn test_requirements_are_lowercased() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("requirements.txt");
        std::fs::write(&path, "NumPy==1.26\nPandas\n").unwrap();

        let project = ProjectModel {
            requirements_path: Some(path),
            ..ProjectModel::default()
        };
        let report = TechStackAnalyzer::new().analyze(&project);

        assert_eq!(report.tech_stack.sources.requirements_txt, vec!["numpy", "pandas"]);
        assert_eq!(report.libraries, vec!["numpy", "pandas"]);
        assert_eq!(report.tech_stack.package_manager, PackageManager::Pip);
        assert_eq!(report.project_type, ProjectType::Scientific);
        // 2 hits + numpy bonus, runner-up 0
        assert_eq!(report.type_scores.scientific, 3.0);
        assert!((report.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_cli_project_from_poetry_scripts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("pyproject.toml"),
            "[tool.poetry.dependencies]\npython = \"^3.11\"\ntyper = \"*\"\n\n[tool.poetry.group.dev.dependencies]\nblack = \"*\"\n\n[tool.poetry.scripts]\ntool = \"tool.cli:app\"\n",
        )
        .unwrap();

        let project = ProjectModel {
            root_path: Some(dir.path().to_path_buf()),
            ..ProjectModel::default()
        };
        let report = TechStackAnalyzer::new().analyze(&project);

        assert_eq!(report.project_type, ProjectType::Cli);
        assert_eq!(report.tech_stack.package_manager, PackageManager::Poetry);
        assert_eq!(report.tech_stack.python.constraint.as_deref(), Some("^3.11"));
        assert_eq!(report.tech_stack.signals.console_scripts, vec!["tool"]);
        assert!(report.tech_stack.signals.has_pyproject);
        assert_eq!(
            report.tech_stack.categories.get("dev"),
            Some(&vec!["black".to_string()])
        );
    }

    #[test]
    fn test_mixed_package_manager() {
        let dir = TempDir::new().unwrap();
        let requirements = dir.path().join("requirements.txt");
        std::fs::write(&requirements, "flask\n").unwrap();
        std::fs::write(
            dir.path().join("pyproject.toml"),
            "[project]\ndependencies = [\"gunicorn\"]\n",
        )
        .unwrap();

        let project = ProjectModel {
            requirements_path: Some(requirements),
            ..ProjectModel::default()
        };
        let report = TechStackAnalyzer::new().analyze(&project);

        assert_eq!(report.tech_stack.package_manager, PackageManager::Mixed);
        assert_eq!(report.type_scores.web, 4.0 + 2.0);
    }

    #[test]
    fn test_noise_and_stdlib_are_filtered() {
        let project = project_with_imports(&[
            "import tests.helpers",
            "from docs import conf",
            "import json",
            "import StringIO",
            "import attrs",
        ]);
        let report = TechStackAnalyzer::new().analyze(&project);

        assert_eq!(report.tech_stack.all_packages, vec!["attrs"]);
        assert_eq!(report.tech_stack.categories.get("library"), Some(&vec!["attrs".to_string()]));
    }

    #[test]
    fn test_empty_project_is_unknown() {
        let report = TechStackAnalyzer::new().analyze(&ProjectModel::default());

        assert_eq!(report.project_type, ProjectType::Unknown);
        assert_eq!(report.confidence, 0.0);
        assert_eq!(report.tech_stack.package_manager, PackageManager::Unknown);
        assert!(report.frameworks.is_empty());
    }

    #[test]
    fn test_ties_prefer_earlier_bucket() {
        let mut packages = BTreeSet::new();
        // web: 0.5 * 2 = 1.0; scientific: 1.0 (plotly, no foundation bonus)
        packages.insert("httpx".to_string());
        packages.insert("redis".to_string());
        packages.insert("plotly".to_string());

        let (project_type, scores, confidence) = classify(&packages, &BuildManifest::default());
        assert_eq!(scores.web, scores.scientific);
        assert_eq!(project_type, ProjectType::Web);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_report_serializes_with_legacy_fields() {
        let report = TechStackAnalyzer::new().analyze(&project_with_imports(&["import django"]));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["project_type"], "web");
        assert_eq!(json["frameworks"][0], "django");
        assert_eq!(json["tech_stack"]["package_manager"], "unknown");
        assert!(json["imports"].is_array());
    }
}
