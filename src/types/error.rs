//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Design Principles
//!
//! - Single unified error type (PyarchError) for everything that can abort a command
//! - Per-file analysis failures are NOT errors: they are recorded on the module
//!   (`ModuleInfo::error`) so one bad file never aborts a batch
//! - No panic/unwrap in library code

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum PyarchError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Parse error in {path}: {message}")]
    Parse { message: String, path: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Root path is not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Unsupported diagram format '{0}' (expected 'plantuml' or 'mermaid')")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, PyarchError>;

impl PyarchError {
    /// Create a parse error for a path
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Whether the error was caused by user input rather than the environment
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidRoot(_) | Self::UnsupportedFormat(_)
        )
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error, turning it into a `PyarchError::Config`
    fn config_context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn config_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| PyarchError::Config(format!("{}: {}", context.into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
