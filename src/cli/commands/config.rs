//! Config Command
//!
//! Manage pyarch configuration.
//!
//! Usage:
//!   pyarch config show [--json]
//!   pyarch config path
//!   pyarch config init [--global] [--force]

use std::path::Path;

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show merged effective configuration
pub fn show(as_json: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    println!("{}", ConfigLoader::render(&config, as_json)?);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    println!("Configuration paths:");
    println!();

    match ConfigLoader::global_config_path() {
        Some(global) => println!("  Global:  {} {}", marker(&global), global.display()),
        None => println!("  Global:  (not available)"),
    }

    let project = ConfigLoader::project_config_path(Path::new("."));
    println!("  Project: {} {}", marker(&project), project.display());
    Ok(())
}

fn marker(path: &Path) -> &'static str {
    if path.exists() { "✓" } else { "✗" }
}

/// Initialize global or project configuration
pub fn init(global: bool, force: bool) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(Path::new("."), force)?
    };

    let scope = if global { "global" } else { "project" };
    Output::new().success(&format!("Initialized {} configuration", scope));
    println!("  Config:    {}", path.display());
    Ok(())
}
