//! pyarch - Static Class-Structure Analyzer for Python Projects
//!
//! Parses Python sources without executing them and reports their class
//! structure: classes, methods, bases, decorators, imports and the
//! composition/aggregation edges implied by attribute annotations and
//! constructor calls.
//!
//! ## Core Features
//!
//! - **Structural extraction**: tree-sitter based, tolerant of bad files
//! - **Class diagrams**: PlantUML and Mermaid, with importance-based limits
//! - **Tech-stack guess**: web / ml / cli / scientific from imports and manifests
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use pyarch::{Config, analyze_local_project};
//!
//! let report = analyze_local_project(Path::new("."), &Config::default())?;
//! println!("{}", report.diagram.text);
//! # Ok::<(), pyarch::PyarchError>(())
//! ```
//!
//! ## Modules
//!
//! - [`analyzer`]: source loading, extraction, discovery, aggregation
//! - [`diagram`]: PlantUML and Mermaid renderers
//! - [`techstack`]: package detection and project-type scoring
//! - [`config`]: layered configuration
//! - [`pipeline`]: end-to-end report

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod diagram;
pub mod pipeline;
pub mod techstack;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{PyarchError, Result, ResultExt};

// Data Model
pub use types::{ClassInfo, FunctionInfo, ModuleInfo, ProjectModel};

// =============================================================================
// Analysis Re-exports
// =============================================================================

pub use analyzer::{Extractor, FileScanner, ProjectAnalyzer, PythonExtractor, SourceLoader};
pub use diagram::{DiagramFormat, DiagramOptions, DiagramRenderer, render_diagram};
pub use pipeline::{AnalysisReport, analyze_local_project};
pub use techstack::{TechStackAnalyzer, TechStackReport};
