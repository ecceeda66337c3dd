//! Code Analyzer Module
//!
//! Static structure analysis of Python projects:
//! - File scanning with gitignore support
//! - Best-effort source decoding
//! - Syntax-tree extraction into the structural model
//! - Project-wide aggregation with per-file failure isolation

pub mod parser;
pub mod project;
pub mod scanner;
pub mod source;

pub use parser::{Extractor, PythonExtractor};
pub use project::ProjectAnalyzer;
pub use scanner::{FileScanner, ScanResult};
pub use source::{SourceLoader, SourceText, decode_source};
