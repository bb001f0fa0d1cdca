//! Runtime configuration loaded from a local JSON secrets file.
//!
//! # Responsibility
//! - Parse the `.dsn`-style JSON file describing storage and logging.
//! - Reject incomplete configuration before any connection is attempted.
//!
//! # Invariants
//! - `db.path` is required and non-blank.
//! - Missing optional settings fall back to documented defaults.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Conventional file name for the local secrets file.
pub const DEFAULT_CONFIG_FILE: &str = ".dsn";

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration loading failure. Fatal at startup.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to decode config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    pub db: DbConfig,
    #[serde(default)]
    pub log: Option<LogConfig>,
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DbConfig {
    /// Database file path, or `:memory:`.
    pub path: String,
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
}

impl DbConfig {
    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BUSY_TIMEOUT)
    }
}

/// Logging settings. `dir` must be absolute when present.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: Option<String>,
    pub dir: String,
}

impl LogConfig {
    pub fn level_or_default(&self) -> &str {
        self.level.as_deref().unwrap_or(default_log_level())
    }
}

impl AppConfig {
    /// Reads and validates the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parses and validates configuration JSON.
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.db.path.trim().is_empty() {
            return Err(ConfigError::Invalid("db.path cannot be empty".to_string()));
        }
        if self.db.busy_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "db.busy_timeout_ms must be positive".to_string(),
            ));
        }
        if let Some(log) = &self.log {
            if log.dir.trim().is_empty() {
                return Err(ConfigError::Invalid("log.dir cannot be empty".to_string()));
            }
        }
        Ok(())
    }
}
