//! Dependency sources: import lines, `requirements.txt` and `pyproject.toml`
//!
//! Every reader here is best-effort. A missing, unreadable or malformed
//! manifest contributes nothing and is only logged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::types::{ProjectModel, Result};

const PYPROJECT_FILE: &str = "pyproject.toml";

static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.-]+").expect("package name pattern is valid")
});

/// `requests>=2.0` → `requests`, `pydantic[email]` → `pydantic`,
/// `pkg.sub` → `pkg`; lowercased, empty when nothing name-like leads.
pub fn normalize_package_name(raw: &str) -> String {
    let Some(found) = PACKAGE_NAME.find(raw.trim()) else {
        return String::new();
    };
    let name = found.as_str();
    let name = name.split('[').next().unwrap_or(name);
    let name = name.split('.').next().unwrap_or(name);
    name.to_lowercase()
}

/// Top-level package of each absolute import line; relative imports are local
pub fn import_packages<'a, I>(imports: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = &'a String>,
{
    imports.into_iter().filter_map(|line| import_package(line))
}

fn import_package(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("from .") {
        return None;
    }

    let name = if let Some(rest) = line.strip_prefix("from ") {
        let module = rest.split_whitespace().next()?;
        module.trim_start_matches('.').split('.').next()?.to_string()
    } else if let Some(rest) = line.strip_prefix("import ") {
        let first = rest.split(',').next()?.trim();
        let name = first.split(" as ").next()?.trim();
        name.split('.').next()?.to_string()
    } else {
        return None;
    };

    let package = normalize_package_name(&name);
    (!package.is_empty()).then_some(package)
}

/// Package names from a requirements file, sorted and de-duplicated.
///
/// Blank lines, comments, editable installs, nested requirement files and
/// pip options are skipped.
pub fn parse_requirements(path: &Path) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("Cannot read {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let mut packages: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .map(normalize_package_name)
        .filter(|name| !name.is_empty())
        .collect();
    packages.sort();
    packages.dedup();
    packages
}

// =============================================================================
// pyproject.toml
// =============================================================================

/// Which dependency conventions a pyproject file uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManifestStyle {
    pub poetry: bool,
    pub pep621: bool,
}

/// Dependencies declared in a build manifest, keyed by normalized name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildManifest {
    pub runtime: BTreeMap<String, String>,
    pub dev: BTreeMap<String, String>,
    pub optional: BTreeMap<String, String>,
    /// Console entry points: name → target
    pub scripts: BTreeMap<String, String>,
    pub python_constraint: Option<String>,
    pub style: ManifestStyle,
}

impl BuildManifest {
    /// Load a pyproject file; unreadable or malformed files give an empty manifest
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Cannot read {}: {}", path.display(), e);
                return Self::default();
            }
        };
        Self::parse(&content).unwrap_or_else(|e| {
            debug!("Malformed {}: {}", path.display(), e);
            Self::default()
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let data: toml::Table = toml::from_str(content)?;
        let mut manifest = Self::default();

        if let Some(poetry) = table(&data, &["tool", "poetry"]) {
            manifest.read_poetry(poetry);
        }
        if let Some(project) = table(&data, &["project"]) {
            manifest.read_pep621(project);
        }
        Ok(manifest)
    }

    pub fn has_dependencies(&self) -> bool {
        !(self.runtime.is_empty() && self.dev.is_empty() && self.optional.is_empty())
    }

    fn read_poetry(&mut self, poetry: &toml::Table) {
        let before = self.dependency_count();

        if let Some(deps) = table(poetry, &["dependencies"]) {
            if let Some(python) = deps.get("python") {
                self.python_constraint = Some(value_text(python));
            }
            insert_table_deps(&mut self.runtime, deps);
        }

        if let Some(groups) = table(poetry, &["group"]) {
            for (group, body) in groups {
                let Some(deps) = body.as_table().and_then(|b| table(b, &["dependencies"])) else {
                    continue;
                };
                let target = if group == "dev" {
                    &mut self.dev
                } else {
                    &mut self.optional
                };
                insert_table_deps(target, deps);
            }
        }

        if let Some(deps) = table(poetry, &["dev-dependencies"]) {
            insert_table_deps(&mut self.dev, deps);
        }

        if let Some(scripts) = table(poetry, &["scripts"]) {
            for (name, target) in scripts {
                self.scripts.insert(name.clone(), value_text(target));
            }
        }

        self.style.poetry = self.dependency_count() > before;
    }

    fn read_pep621(&mut self, project: &toml::Table) {
        let before = self.dependency_count();

        if let Some(deps) = project.get("dependencies").and_then(|d| d.as_array()) {
            insert_array_deps(&mut self.runtime, deps);
        }

        if let Some(groups) = table(project, &["optional-dependencies"]) {
            for (group, deps) in groups {
                let Some(deps) = deps.as_array() else {
                    continue;
                };
                let target = if matches!(group.as_str(), "dev" | "test") {
                    &mut self.dev
                } else {
                    &mut self.optional
                };
                insert_array_deps(target, deps);
            }
        }

        if let Some(scripts) = table(project, &["scripts"]) {
            for (name, target) in scripts {
                self.scripts
                    .entry(name.clone())
                    .or_insert_with(|| value_text(target));
            }
        }

        if self.python_constraint.is_none() {
            self.python_constraint = project
                .get("requires-python")
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }

        self.style.pep621 = self.dependency_count() > before;
    }

    fn dependency_count(&self) -> usize {
        self.runtime.len() + self.dev.len() + self.optional.len()
    }
}

/// Nested table lookup
fn table<'a>(root: &'a toml::Table, keys: &[&str]) -> Option<&'a toml::Table> {
    let mut current = root;
    for key in keys {
        current = current.get(*key)?.as_table()?;
    }
    Some(current)
}

/// Poetry-style `name = "^1.0"` / `name = { version = "..." }`
fn insert_table_deps(target: &mut BTreeMap<String, String>, deps: &toml::Table) {
    for (name, spec) in deps {
        let normalized = normalize_package_name(name);
        if normalized.is_empty() || normalized == "python" {
            continue;
        }
        target.insert(normalized, value_text(spec));
    }
}

/// PEP 508 strings: `"httpx[http2]>=0.27"`
fn insert_array_deps(target: &mut BTreeMap<String, String>, deps: &[toml::Value]) {
    for spec in deps.iter().filter_map(|d| d.as_str()) {
        let normalized = normalize_package_name(spec);
        if normalized.is_empty() {
            continue;
        }
        target.insert(normalized, spec.to_string());
    }
}

fn value_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Declared pyproject path, else next to the requirements file, else at the root
pub fn detect_pyproject_path(project: &ProjectModel) -> Option<PathBuf> {
    if let Some(path) = project.pyproject_path.as_ref().filter(|p| p.is_file()) {
        return Some(path.clone());
    }

    let beside_requirements = project
        .requirements_path
        .as_ref()
        .and_then(|r| r.parent())
        .map(|dir| dir.join(PYPROJECT_FILE));
    let at_root = project.root_path.as_ref().map(|r| r.join(PYPROJECT_FILE));

    beside_requirements
        .into_iter()
        .chain(at_root)
        .find(|candidate| candidate.is_file())
}
