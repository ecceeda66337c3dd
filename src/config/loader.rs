//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/pyarch/config.toml)
//! 3. Project config (<project>/.pyarch/config.toml)
//! 4. Environment variables (PYARCH_* prefix, `__` between sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{PyarchError, Result, ResultExt};

const APP_DIR: &str = "pyarch";
const PROJECT_DIR: &str = ".pyarch";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "PYARCH_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory
    pub fn load() -> Result<Config> {
        Self::load_for(Path::new("."))
    }

    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project (under `project_root`) → env vars
    pub fn load_for(project_root: &Path) -> Result<Config> {
        let global = Self::global_config_path();
        let project = Self::project_config_path(project_root);
        Self::load_layers(global.as_deref(), &project)
    }

    fn load_layers(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // PYARCH_DIAGRAM__MAX_CLASSES -> diagram.max_classes
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| PyarchError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| PyarchError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/pyarch/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join(APP_DIR))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Get path to project config file
    pub fn project_config_path(project_root: &Path) -> PathBuf {
        project_root.join(PROJECT_DIR).join(CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Render the effective configuration as TOML or JSON
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).config_context("Cannot render configuration")
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write the default global config; returns the file path
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            PyarchError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_template(&global_dir.join(CONFIG_FILE), force)
    }

    /// Write the default project config under `project_root`; returns the file path
    pub fn init_project(project_root: &Path, force: bool) -> Result<PathBuf> {
        Self::write_template(&Self::project_config_path(project_root), force)
    }

    fn write_template(path: &Path, force: bool) -> Result<PathBuf> {
        if path.exists() && !force {
            return Err(PyarchError::Config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, Self::default_config())?;
        info!("Created config: {}", path.display());
        Ok(path.to_path_buf())
    }

    /// Generate default config content (TOML)
    fn default_config() -> String {
        r#"# pyarch configuration
# Project settings in .pyarch/config.toml override ~/.config/pyarch/config.toml.
# Any key can also be set from the environment, e.g. PYARCH_DIAGRAM__FORMAT=mermaid.

version = "1.0"

[analysis]
# Bytes read per source file; larger files are truncated (0 = unlimited)
max_file_size = 1048576
respect_gitignore = true
exclude = [
    "build/**",
    "dist/**",
    "*.egg-info/**",
]

[diagram]
# plantuml | mermaid
format = "plantuml"
public_only = false
group_by_module = true
show_relations = true
# Keep only the N most important classes (0 = all)
max_classes = 40

[tech_stack]
enabled = true
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::DiagramFormat;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_layers(
            None,
            &ConfigLoader::project_config_path(temp_dir.path()),
        )
        .unwrap();
        assert_eq!(config.version, "1.0");
        assert!(config.diagram.show_relations);
    }

    #[test]
    fn test_project_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        fs::write(
            &global,
            "[diagram]\nformat = \"mermaid\"\npublic_only = true\n",
        )
        .unwrap();

        let project_root = temp_dir.path().join("project");
        let project = ConfigLoader::project_config_path(&project_root);
        fs::create_dir_all(project.parent().unwrap()).unwrap();
        fs::write(&project, "[diagram]\nformat = \"plantuml\"\n").unwrap();

        let config = ConfigLoader::load_layers(Some(global.as_path()), &project).unwrap();
        assert_eq!(config.diagram.format, DiagramFormat::PlantUml);
        assert!(config.diagram.public_only);
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[diagram]\nformat = \"graphviz\"\n").unwrap();

        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, PyarchError::Config(_)));
    }

    #[test]
    fn test_init_project_writes_loadable_template() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::init_project(temp_dir.path(), false).unwrap();

        assert_eq!(path, temp_dir.path().join(".pyarch/config.toml"));
        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config, Config::default());

        assert!(ConfigLoader::init_project(temp_dir.path(), false).is_err());
        assert!(ConfigLoader::init_project(temp_dir.path(), true).is_ok());
    }

    #[test]
    fn test_render_formats() {
        let config = Config::default();
        let toml_text = ConfigLoader::render(&config, false).unwrap();
        assert!(toml_text.contains("[diagram]"));
        assert!(toml_text.contains("format = \"plantuml\""));

        let json_text = ConfigLoader::render(&config, true).unwrap();
        assert!(json_text.contains("\"max_classes\": 40"));
    }

    #[test]
    fn test_env_override() {
        let temp_dir = TempDir::new().unwrap();
        // SAFETY: no other test reads this variable
        unsafe {
            std::env::set_var("PYARCH_TECH_STACK__ENABLED", "false");
        }
        let config = ConfigLoader::load_layers(
            None,
            &ConfigLoader::project_config_path(temp_dir.path()),
        );
        unsafe {
            std::env::remove_var("PYARCH_TECH_STACK__ENABLED");
        }
        assert!(!config.unwrap().tech_stack.enabled);
    }
}
