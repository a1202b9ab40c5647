//! Core runtime configuration.
//!
//! # Responsibility
//! - Load database and logging settings from a TOML file.
//! - Reject settings the core cannot honour before anything is opened.
//!
//! # Invariants
//! - Every section is optional in the file; missing values take defaults.
//! - An absent `database.path` selects an in-memory database.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path:?}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {source}")]
    ParseConfig { source: toml::de::Error },
    #[error("{message}")]
    Validation { message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file path. `None` opens an in-memory database.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// File logging settings. Logging stays off unless `dir` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub dir: Option<PathBuf>,
}

/// Reads, parses and validates a config file.
pub fn load(path: &Path) -> ConfigResult<CoreConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    from_toml_str(&raw)
}

/// Parses and validates config text.
pub fn from_toml_str(raw: &str) -> ConfigResult<CoreConfig> {
    let cfg: CoreConfig =
        toml::from_str(raw).map_err(|source| ConfigError::ParseConfig { source })?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn validate(cfg: &CoreConfig) -> ConfigResult<()> {
    if cfg.database.busy_timeout_ms == 0 {
        return Err(ConfigError::Validation {
            message: "database.busy_timeout_ms must be greater than zero".to_string(),
        });
    }
    if let Some(path) = cfg.database.path.as_ref() {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                message: "database.path must be non-empty when set".to_string(),
            });
        }
    }
    if let Some(dir) = cfg.logging.dir.as_ref() {
        if !dir.is_absolute() {
            return Err(ConfigError::Validation {
                message: format!("logging.dir must be an absolute path, got {dir:?}"),
            });
        }
    }
    if let Some(level) = cfg.logging.level.as_deref() {
        if crate::logging::normalize_level(level).is_err() {
            return Err(ConfigError::Validation {
                message: format!("logging.level `{level}` is not one of trace|debug|info|warn|error"),
            });
        }
    }

    Ok(())
}
