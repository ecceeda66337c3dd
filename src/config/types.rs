//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/pyarch/) and project (.pyarch/) level configuration.

use serde::{Deserialize, Serialize};

use crate::constants::diagram::DEFAULT_MAX_CLASSES;
use crate::constants::source::DEFAULT_MAX_FILE_SIZE;
use crate::diagram::{DiagramFormat, DiagramOptions};
use crate::types::{PyarchError, Result};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// File discovery and source loading
    pub analysis: AnalysisConfig,

    /// Class diagram rendering
    pub diagram: DiagramConfig,

    /// Tech-stack classification
    pub tech_stack: TechStackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            analysis: AnalysisConfig::default(),
            diagram: DiagramConfig::default(),
            tech_stack: TechStackConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `PyarchError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(PyarchError::Config("version must not be empty".to_string()));
        }

        for pattern in &self.analysis.exclude {
            if pattern.trim().is_empty() {
                return Err(PyarchError::Config(
                    "analysis.exclude must not contain empty patterns".to_string(),
                ));
            }
            glob::Pattern::new(pattern).map_err(|e| {
                PyarchError::Config(format!(
                    "analysis.exclude pattern '{}' is invalid: {}",
                    pattern, e
                ))
            })?;
        }

        Ok(())
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Glob patterns to exclude (relative to the project root)
    pub exclude: Vec<String>,

    /// Maximum bytes read per source file; 0 = unlimited
    pub max_file_size: u64,

    /// Honour .gitignore files during discovery
    pub respect_gitignore: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            exclude: vec![
                "build/**".to_string(),
                "dist/**".to_string(),
                "*.egg-info/**".to_string(),
            ],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            respect_gitignore: true,
        }
    }
}

// =============================================================================
// Diagram Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    /// Output notation (plantuml | mermaid)
    pub format: DiagramFormat,

    /// Hide `_private` and `__dunder__` methods
    pub public_only: bool,

    /// Wrap classes in per-module packages
    pub group_by_module: bool,

    /// Draw inheritance and composition edges
    pub show_relations: bool,

    /// Keep only the N most important classes; 0 = all
    pub max_classes: usize,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            format: DiagramFormat::PlantUml,
            public_only: false,
            group_by_module: true,
            show_relations: true,
            max_classes: DEFAULT_MAX_CLASSES,
        }
    }
}

impl DiagramConfig {
    pub fn options(&self) -> DiagramOptions {
        DiagramOptions {
            public_only: self.public_only,
            group_by_module: self.group_by_module,
            show_relations: self.show_relations,
            max_classes: self.max_classes,
        }
    }
}

// =============================================================================
// Tech Stack Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechStackConfig {
    pub enabled: bool,
}

impl Default for TechStackConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// =============================================================================
// Tests
// =============================================================================
