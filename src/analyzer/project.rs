//! Project Model Aggregator
//!
//! Extracts every file independently and collects the modules in input
//! order. A failure inside one file, even a panic, becomes an empty module
//! with error metadata; the batch always completes.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::parser::{Extractor, PythonExtractor};
use super::scanner::ScanResult;
use crate::types::{ModuleError, ModuleErrorKind, ModuleInfo, ProjectModel};

pub struct ProjectAnalyzer<E: Extractor = PythonExtractor> {
    extractor: E,
}

impl Default for ProjectAnalyzer<PythonExtractor> {
    fn default() -> Self {
        Self::new(PythonExtractor::new())
    }
}

impl<E: Extractor> ProjectAnalyzer<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    /// Extract each path in order. Never fails.
    pub fn analyze_files<P: AsRef<Path>>(&self, paths: &[P]) -> ProjectModel {
        let modules: Vec<ModuleInfo> = paths
            .iter()
            .map(|p| self.analyze_file(p.as_ref()))
            .collect();

        let failed = modules.iter().filter(|m| m.has_error()).count();
        info!(
            "Analyzed {} modules ({} with errors)",
            modules.len(),
            failed
        );
        ProjectModel::new(modules)
    }

    /// Extract the scanned files and carry over the manifest locations
    pub fn analyze_scan(&self, scan: &ScanResult) -> ProjectModel {
        let mut model = self.analyze_files(&scan.python_files);
        model.root_path = Some(scan.root.clone());
        model.requirements_path = scan.requirements_file.clone();
        model.pyproject_path = scan.pyproject_file.clone();
        model.setup_cfg_path = scan.setup_cfg_file.clone();
        model
    }

    fn analyze_file(&self, path: &Path) -> ModuleInfo {
        let resolved = resolve_path(path);
        match panic::catch_unwind(AssertUnwindSafe(|| self.extractor.extract_file(&resolved))) {
            Ok(module) => module,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("Extraction panicked for {}: {}", resolved.display(), message);
                ModuleInfo::failed(
                    resolved,
                    ModuleError::new(ModuleErrorKind::Unhandled, message),
                )
            }
        }
    }
}

fn resolve_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct PanickingExtractor;

    impl Extractor for PanickingExtractor {
        fn extract_file(&self, path: &Path) -> ModuleInfo {
            if path.ends_with("bad.py") {
                panic!("boom");
            }
            ModuleInfo::new(path)
        }
    }

    #[test]
    fn test_order_follows_input() {
        let dir = TempDir::new().unwrap();
        let b = dir.path().join("b.py");
        let a = dir.path().join("a.py");
        fs::write(&b, "class B:\n    pass\n").unwrap();
        fs::write(&a, "class A:\n    pass\n").unwrap();

        let model = ProjectAnalyzer::default().analyze_files(&[&b, &a]);
        let names: Vec<_> = model.classes().map(|(_, c)| c.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_bad_files_do_not_abort_batch() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.py");
        let broken = dir.path().join("broken.py");
        fs::write(&good, "def ok():\n    pass\n").unwrap();
        fs::write(&broken, "def broken(:\n").unwrap();
        let missing = dir.path().join("missing.py");

        let model = ProjectAnalyzer::default().analyze_files(&[&good, &broken, &missing]);
        assert_eq!(model.modules.len(), 3);
        assert!(model.modules[0].error.is_none());
        assert_eq!(model.modules[0].functions.len(), 1);
        assert_eq!(
            model.modules[1].error.as_ref().map(|e| e.kind),
            Some(ModuleErrorKind::Syntax)
        );
        assert_eq!(
            model.modules[2].error.as_ref().map(|e| e.kind),
            Some(ModuleErrorKind::Io)
        );
        assert_eq!(model.summary().failed_modules, 2);
    }

    #[test]
    fn test_panics_become_unhandled_modules() {
        let analyzer = ProjectAnalyzer::new(PanickingExtractor);
        let model = analyzer.analyze_files(&["ok.py", "bad.py", "other.py"]);

        assert_eq!(model.modules.len(), 3);
        let error = model.modules[1].error.as_ref().unwrap();
        assert_eq!(error.kind, ModuleErrorKind::Unhandled);
        assert_eq!(error.message, "boom");
        assert!(model.modules[2].error.is_none());
    }

    #[test]
    fn test_empty_input_gives_empty_project() {
        let paths: [&str; 0] = [];
        let model = ProjectAnalyzer::default().analyze_files(&paths);
        assert!(model.modules.is_empty());
        assert_eq!(model.summary().classes, 0);
    }
}
