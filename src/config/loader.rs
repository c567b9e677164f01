//! Application configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Locations searched by [`discover`], in order.
pub const SEARCH_PATHS: &[&str] = &[
    "config.yaml",
    "config/config.yaml",
    "config.yml",
    "config/config.yml",
    "config.toml",
    "config/config.toml",
];

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("no config file found (searched: {})", .0.join(", "))]
    NotFound(Vec<String>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a YAML or TOML file.
///
/// The format is chosen by extension; anything other than `.toml` is read as YAML.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: AppConfig = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(path = ?path, app = %config.name, env = %config.env, "Application config loaded");
    Ok(config)
}

/// Find the first existing file from [`SEARCH_PATHS`] under `base`.
pub fn discover_in(base: &Path) -> Result<PathBuf, ConfigError> {
    SEARCH_PATHS
        .iter()
        .map(|p| base.join(p))
        .find(|p| p.is_file())
        .ok_or_else(|| ConfigError::NotFound(SEARCH_PATHS.iter().map(|s| s.to_string()).collect()))
}

/// Locate and load the application config from the working directory.
pub fn discover() -> Result<AppConfig, ConfigError> {
    let path = discover_in(Path::new("."))?;
    load_config(&path)
}
