//! Application configuration loaded from a JSON file.
//!
//! # Responsibility
//! - Describe database, timeout, enrichment and logging settings.
//! - Fill every missing field with a working default.
//!
//! # Invariants
//! - A validated config has a non-zero timeout and a lookup limit within
//!   `1..=Semaphore::MAX_PERMITS`.

use crate::logging::default_log_level;
use crate::service::{ServiceSettings, DEFAULT_CONTEXT_TIMEOUT, DEFAULT_MAX_CONCURRENT_LOOKUPS};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Semaphore;

const DEFAULT_DATABASE_PATH: &str = "todo.sqlite3";

/// Errors raised while loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
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

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Raises the default log level to `debug`.
    pub debug: bool,
    pub database: DatabaseConfig,
    pub context: ContextConfig,
    pub enrichment: EnrichmentConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path; `:memory:` opens a transient database.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DATABASE_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Per-operation deadline in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_CONTEXT_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Upper bound on concurrent activity lookups per page.
    pub max_concurrent_lookups: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// `trace|debug|info|warn|error`; falls back to the build-mode default.
    pub level: Option<String>,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub dir: Option<String>,
}

impl AppConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.timeout_ms == 0 {
            return Err(ConfigError::Invalid("context.timeout_ms must be positive"));
        }
        if self.enrichment.max_concurrent_lookups == 0 {
            return Err(ConfigError::Invalid(
                "enrichment.max_concurrent_lookups must be positive",
            ));
        }
        if self.enrichment.max_concurrent_lookups > Semaphore::MAX_PERMITS {
            return Err(ConfigError::Invalid(
                "enrichment.max_concurrent_lookups exceeds the permit limit",
            ));
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty"));
        }
        Ok(())
    }

    /// Service knobs derived from this config.
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            context_timeout: Duration::from_millis(self.context.timeout_ms),
            max_concurrent_lookups: self.enrichment.max_concurrent_lookups,
        }
    }

    /// Effective log level: explicit level, else `debug` flag, else build default.
    pub fn log_level(&self) -> &str {
        match self.log.level.as_deref() {
            Some(level) => level,
            None if self.debug => "debug",
            None => default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};
    use std::time::Duration;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.service_settings().max_concurrent_lookups, 8);
        assert_eq!(
            config.service_settings().context_timeout,
            Duration::from_secs(2)
        );
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = AppConfig::from_json_str(
            r#"{
                "debug": true,
                "database": { "path": ":memory:" },
                "context": { "timeout_ms": 250 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(
            config.service_settings().context_timeout,
            Duration::from_millis(250)
        );
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn zero_lookup_limit_is_rejected() {
        let err = AppConfig::from_json_str(r#"{ "enrichment": { "max_concurrent_lookups": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn lookup_limit_above_permit_ceiling_is_rejected() {
        let err = AppConfig::from_json_str(
            r#"{ "enrichment": { "max_concurrent_lookups": 18446744073709551615 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = AppConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "context": { "timeout_ms": 900 } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.context.timeout_ms, 900);

        let missing = AppConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
