use ignore::WalkBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::types::{PyarchError, Result, log_filter_error, log_filter_warn};

/// Directories never descended into
const SKIP_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    "env",
    "venv",
    ".venv",
    "node_modules",
    ".idea",
    ".mypy_cache",
];

const PYTHON_EXTENSION: &str = "py";
const REQUIREMENTS_FILE: &str = "requirements.txt";
const PYPROJECT_FILE: &str = "pyproject.toml";
const SETUP_CFG_FILE: &str = "setup.cfg";

/// Python sources plus the dependency manifests found next to them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub root: PathBuf,
    /// Sorted by path
    pub python_files: Vec<PathBuf>,
    pub requirements_file: Option<PathBuf>,
    pub pyproject_file: Option<PathBuf>,
    pub setup_cfg_file: Option<PathBuf>,
}

pub struct FileScanner {
    root: PathBuf,
    exclude: Vec<String>,
    respect_gitignore: bool,
}

impl FileScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exclude: vec![],
            respect_gitignore: true,
        }
    }

    /// Glob patterns matched against root-relative paths (`tests/**`)
    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn respect_gitignore(mut self, enabled: bool) -> Self {
        self.respect_gitignore = enabled;
        self
    }

    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root.is_dir() {
            return Err(PyarchError::InvalidRoot(self.root.clone()));
        }
        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());

        let patterns: Vec<glob::Pattern> = self
            .exclude
            .iter()
            .filter_map(|p| log_filter_warn(glob::Pattern::new(p), "invalid exclude pattern"))
            .collect();

        let walker = WalkBuilder::new(&root)
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .follow_links(false) // Security: prevent symlink traversal attacks
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(is_dir && entry.depth() > 0 && is_skipped_dir(entry.file_name().to_str()))
            })
            .build();

        let mut result = ScanResult {
            root: root.clone(),
            ..ScanResult::default()
        };
        // (depth, path) of the shallowest manifest of each kind
        let mut requirements: Option<(usize, PathBuf)> = None;
        let mut pyproject: Option<(usize, PathBuf)> = None;
        let mut setup_cfg: Option<(usize, PathBuf)> = None;

        for entry in walker.filter_map(|e| log_filter_error(e, "walking project tree")) {
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let relative = path.strip_prefix(&root).unwrap_or(path);
            if is_excluded(&patterns, relative) {
                continue;
            }

            let depth = entry.depth();
            match path.file_name().and_then(|n| n.to_str()) {
                Some(REQUIREMENTS_FILE) => keep_shallowest(&mut requirements, depth, path),
                Some(PYPROJECT_FILE) => keep_shallowest(&mut pyproject, depth, path),
                Some(SETUP_CFG_FILE) => keep_shallowest(&mut setup_cfg, depth, path),
                _ => {}
            }

            if is_python_file(path) {
                result.python_files.push(path.to_path_buf());
            }
        }

        result.python_files.sort();
        result.requirements_file = requirements.map(|(_, p)| p);
        result.pyproject_file = pyproject.map(|(_, p)| p);
        result.setup_cfg_file = setup_cfg.map(|(_, p)| p);

        tracing::debug!(
            "Scanned {}: {} Python files",
            root.display(),
            result.python_files.len()
        );
        Ok(result)
    }
}

fn is_skipped_dir(name: Option<&str>) -> bool {
    name.is_some_and(|n| SKIP_DIRS.contains(&n))
}

fn is_python_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PYTHON_EXTENSION))
}

fn is_excluded(patterns: &[glob::Pattern], relative: &Path) -> bool {
    let path_str = relative.to_string_lossy();
    patterns.iter().any(|p| p.matches(&path_str))
}

fn keep_shallowest(slot: &mut Option<(usize, PathBuf)>, depth: usize, path: &Path) {
    let better = match slot {
        Some((best_depth, best_path)) => (depth, path) < (*best_depth, best_path.as_path()),
        None => true,
    };
    if better {
        *slot = Some((depth, path.to_path_buf()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn relative_files(result: &ScanResult) -> Vec<String> {
        result
            .python_files
            .iter()
            .map(|p| {
                p.strip_prefix(&result.root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_collects_sorted_python_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "pkg/b.py");
        touch(dir.path(), "pkg/a.py");
        touch(dir.path(), "main.py");
        touch(dir.path(), "README.md");
        touch(dir.path(), "logo.png");

        let result = FileScanner::new(dir.path()).scan().unwrap();
        assert_eq!(relative_files(&result), vec!["main.py", "pkg/a.py", "pkg/b.py"]);
    }

    #[test]
    fn test_skips_environment_and_cache_dirs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "app.py");
        touch(dir.path(), "venv/lib/site.py");
        touch(dir.path(), ".venv/lib/site.py");
        touch(dir.path(), "__pycache__/app.py");
        touch(dir.path(), "node_modules/x/y.py");

        let result = FileScanner::new(dir.path()).scan().unwrap();
        assert_eq!(relative_files(&result), vec!["app.py"]);
    }

    #[test]
    fn test_exclude_patterns_are_root_relative() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "app.py");
        touch(dir.path(), "tests/test_app.py");

        let result = FileScanner::new(dir.path())
            .with_exclude(vec!["tests/**".to_string(), "[invalid".to_string()])
            .scan()
            .unwrap();
        assert_eq!(relative_files(&result), vec!["app.py"]);
    }

    #[test]
    fn test_shallowest_manifests_win() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "sub/requirements.txt");
        touch(dir.path(), "requirements.txt");
        touch(dir.path(), "backend/pyproject.toml");
        touch(dir.path(), "setup.cfg");

        let result = FileScanner::new(dir.path()).scan().unwrap();
        let root = &result.root;
        assert_eq!(result.requirements_file, Some(root.join("requirements.txt")));
        assert_eq!(result.pyproject_file, Some(root.join("backend/pyproject.toml")));
        assert_eq!(result.setup_cfg_file, Some(root.join("setup.cfg")));
    }

    #[test]
    fn test_gitignore_is_respected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "generated/\n").unwrap();
        touch(dir.path(), "app.py");
        touch(dir.path(), "generated/models.py");

        let result = FileScanner::new(dir.path()).scan().unwrap();
        assert_eq!(relative_files(&result), vec!["app.py"]);

        let unfiltered = FileScanner::new(dir.path())
            .respect_gitignore(false)
            .scan()
            .unwrap();
        assert_eq!(unfiltered.python_files.len(), 2);
    }

    #[test]
    fn test_missing_root_is_invalid() {
        let dir = TempDir::new().unwrap();
        let err = FileScanner::new(dir.path().join("nope")).scan().unwrap_err();
        assert!(matches!(err, PyarchError::InvalidRoot(_)));
    }

    #[test]
    fn test_file_root_is_invalid() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "single.py");
        let err = FileScanner::new(dir.path().join("single.py")).scan().unwrap_err();
        assert!(matches!(err, PyarchError::InvalidRoot(_)));
    }
}
