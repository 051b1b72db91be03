//! Runtime configuration for processes embedding the broadcast store.
//!
//! # Configuration Precedence
//!
//! 1. Explicit overrides (CLI flags)
//! 2. Environment variables `MINYAN_DB_PATH`, `MINYAN_LOG_LEVEL`,
//!    `MINYAN_LOG_DIR`
//! 3. Defaults: `minyan.sqlite3`, build-mode log level, no file logging

use crate::logging::{default_log_level, init_logging, normalize_level, LoggingError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "MINYAN_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "MINYAN_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "MINYAN_LOG_DIR";
pub const DEFAULT_DB_FILE_NAME: &str = "minyan.sqlite3";

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel { origin: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel { origin, value } => write!(
                f,
                "invalid log level `{value}` from {origin}; expected trace|debug|info|warn|error"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// File logging is disabled when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(DB_PATH_ENV) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(LOG_LEVEL_ENV) {
            config.log_level = parse_level(&level, LOG_LEVEL_ENV)?;
        }
        config.log_dir = read(LOG_DIR_ENV).map(PathBuf::from);
        Ok(config)
    }

    /// Applies explicit overrides on top of the resolved values.
    pub fn with_overrides(
        mut self,
        db_path: Option<PathBuf>,
        log_level: Option<&str>,
        log_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = db_path {
            self.db_path = path;
        }
        if let Some(level) = log_level {
            self.log_level = parse_level(level, "command line")?;
        }
        if log_dir.is_some() {
            self.log_dir = log_dir;
        }
        Ok(self)
    }

    /// Starts file logging when a log directory is configured.
    ///
    /// Returns `Ok(false)` when logging is disabled.
    pub fn init_logging(&self) -> Result<bool, LoggingError> {
        match &self.log_dir {
            Some(dir) => init_logging(self.log_level, dir).map(|()| true),
            None => Ok(false),
        }
    }
}

fn parse_level(value: &str, origin: &'static str) -> Result<&'static str, ConfigError> {
    normalize_level(value).map_err(|_| ConfigError::InvalidLogLevel {
        origin,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = CoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.db_path, PathBuf::from("minyan.sqlite3"));
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn environment_values_override_defaults_and_blanks_are_ignored() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            (DB_PATH_ENV, "/var/lib/minyan/store.db"),
            (LOG_LEVEL_ENV, "WARNING"),
            (LOG_DIR_ENV, "   "),
        ]))
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/minyan/store.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn overrides_win_over_environment() {
        let config = CoreConfig::from_lookup(lookup_from(&[(LOG_LEVEL_ENV, "error")]))
            .unwrap()
            .with_overrides(
                Some(PathBuf::from("other.db")),
                Some("trace"),
                Some(PathBuf::from("/tmp/minyan-logs")),
            )
            .unwrap();

        assert_eq!(config.db_path, PathBuf::from("other.db"));
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/minyan-logs")));
    }

    #[test]
    fn invalid_level_names_its_source() {
        let err = CoreConfig::from_lookup(lookup_from(&[(LOG_LEVEL_ENV, "chatty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidLogLevel {
                origin: LOG_LEVEL_ENV,
                value: "chatty".to_string(),
            }
        );
    }

    #[test]
    fn logging_stays_off_without_directory() {
        assert_eq!(CoreConfig::default().init_logging(), Ok(false));
    }
}
