//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/idforest/idforest.toml`
//! 3. Environment variables: `IDFOREST_*` prefix
//! 4. Command-line overrides (applied by the caller)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::HighlightScope;
use crate::application::ApplicationError;
use crate::domain::DEFAULT_MAX_AGE;

/// Unified configuration for idforest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Persisted forest document (default: ~/.idforest/forest.json)
    pub data_file: PathBuf,
    /// Duplicate-instance highlighting policy
    pub highlight: HighlightScope,
    /// Upper bound (inclusive) for randomly assigned ages
    pub max_age: u8,
}

/// Raw settings for intermediate parsing (None → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_file: Option<PathBuf>,
    pub highlight: Option<HighlightScope>,
    pub max_age: Option<u8>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: default_base_dir().join("forest.json"),
            highlight: HighlightScope::default(),
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

/// Get the default base directory (~/.idforest).
fn default_base_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".idforest"))
        .unwrap_or_else(|| PathBuf::from("~/.idforest"))
}

/// Get the XDG config directory for idforest.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "idforest").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("idforest.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_file: overlay
                .data_file
                .clone()
                .unwrap_or_else(|| self.data_file.clone()),
            highlight: overlay.highlight.unwrap_or(self.highlight),
            max_age: overlay.max_age.unwrap_or(self.max_age),
        }
    }

    /// Expand `~`, `$VAR` and `${VAR}` in the data file path.
    fn expand_paths(&mut self) {
        let raw = self.data_file.to_string_lossy().to_string();
        let expanded = shellexpand::full(&raw)
            .map(|s| s.into_owned())
            .unwrap_or(raw);
        self.data_file = PathBuf::from(expanded);
    }

    /// Load settings with layered precedence.
    pub fn load() -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref())
    }

    /// Load settings using `config_file` as the global layer.
    ///
    /// A missing file is skipped; a malformed one is an error.
    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(path) = config_file {
            if path.exists() {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply IDFOREST_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("IDFOREST")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_file") {
            settings.data_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("highlight") {
            settings.highlight = val.parse().map_err(|message| ApplicationError::Config {
                message,
            })?;
        }
        if let Ok(val) = config.get_string("max_age") {
            settings.max_age = val.parse().map_err(|e| ApplicationError::Config {
                message: format!("IDFOREST_MAX_AGE={}: {}", val, e),
            })?;
        }

        Ok(settings)
    }

    /// Render as TOML for display.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }
}
