//! Configuration management for Parley
//!
//! Configuration comes from a TOML file, from `PARLEY_*` environment
//! variables layered over the defaults, or both. Every loader finishes with
//! [`Config::validate`].

use crate::membership::{GroupLimits, DEFAULT_MAX_ADMINS, DEFAULT_MAX_MEMBERS};
use crate::messaging::DEFAULT_EDIT_WINDOW;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store configuration
    pub store: StoreConfig,

    /// Group and message limits
    pub limits: LimitsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub pool_size: u32,

    /// How long to wait for a pooled connection
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,

    /// How long a transaction waits on a locked database before failing
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

/// Group capacity and edit window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_members: u32,

    pub max_admins: u32,

    /// How long after sending a message its author may edit it
    #[serde(with = "humantime_serde")]
    pub edit_window: Duration,

    /// Messages fed to the summarizer
    pub summary_message_limit: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./parley.db"),
            pool_size: 8,
            connection_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_members: DEFAULT_MAX_MEMBERS,
            max_admins: DEFAULT_MAX_ADMINS,
            edit_window: DEFAULT_EDIT_WINDOW,
            summary_message_limit: 50,
        }
    }
}

impl LimitsConfig {
    pub fn group_limits(&self) -> GroupLimits {
        GroupLimits {
            max_members: self.max_members,
            max_admins: self.max_admins,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

fn parse_env<T>(key: &'static str, what: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnv {
                key,
                what,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn parse_env_duration(key: &'static str, what: &'static str) -> Result<Option<Duration>, ConfigError> {
    match env::var(key) {
        Ok(raw) => humantime_serde::re::humantime::parse_duration(&raw)
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnv {
                key,
                what,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: PARLEY_<SECTION>_<KEY>
    /// Example: PARLEY_STORE_DATABASE_PATH=/var/lib/parley/parley.db
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay any `PARLEY_*` variables present onto this configuration
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = env::var("PARLEY_STORE_DATABASE_PATH") {
            self.store.database_path = PathBuf::from(path);
        }
        if let Some(size) = parse_env("PARLEY_STORE_POOL_SIZE", "pool size")? {
            self.store.pool_size = size;
        }
        if let Some(timeout) = parse_env_duration("PARLEY_STORE_BUSY_TIMEOUT", "busy timeout")? {
            self.store.busy_timeout = timeout;
        }

        if let Some(max) = parse_env("PARLEY_LIMITS_MAX_MEMBERS", "max members")? {
            self.limits.max_members = max;
        }
        if let Some(max) = parse_env("PARLEY_LIMITS_MAX_ADMINS", "max admins")? {
            self.limits.max_admins = max;
        }
        if let Some(window) = parse_env_duration("PARLEY_LIMITS_EDIT_WINDOW", "edit window")? {
            self.limits.edit_window = window;
        }

        if let Ok(level) = env::var("PARLEY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = parse_env("PARLEY_LOG_JSON", "JSON flag")? {
            self.logging.json_format = json;
        }

        Ok(())
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.pool_size == 0 {
            return Err(ConfigError::Invalid(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        if self.limits.max_members == 0 || self.limits.max_admins == 0 {
            return Err(ConfigError::Invalid(
                "max_members and max_admins must be greater than 0".to_string(),
            ));
        }

        if self.limits.max_admins > self.limits.max_members {
            return Err(ConfigError::Invalid(format!(
                "max_admins ({}) cannot exceed max_members ({})",
                self.limits.max_admins, self.limits.max_members
            )));
        }

        if self.limits.edit_window.is_zero() {
            return Err(ConfigError::Invalid(
                "edit_window must be greater than 0".to_string(),
            ));
        }

        if self.limits.summary_message_limit == 0 {
            return Err(ConfigError::Invalid(
                "summary_message_limit must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeCategory;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.max_members, 25);
        assert_eq!(config.limits.max_admins, 2);
        assert_eq!(config.limits.edit_window, Duration::from_secs(3600));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.store.pool_size = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.limits.max_admins = 30;
        assert!(config.validate().is_err());

        config = Config::default();
        config.limits.edit_window = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parley.toml");
        std::fs::write(
            &path,
            r#"
                [limits]
                edit_window = "30m"

                [store]
                database_path = "/tmp/chat.db"
            "#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.limits.edit_window, Duration::from_secs(1800));
        assert_eq!(config.limits.max_members, 25);
        assert_eq!(config.store.database_path, PathBuf::from("/tmp/chat.db"));
        assert_eq!(config.store.pool_size, 8);
    }

    #[test]
    fn test_load_errors_are_categorized() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = Config::from_file(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Read { ref path, .. } if *path == missing));
        assert_eq!(err.category(), OutcomeCategory::NotFound);

        let garbled = dir.path().join("garbled.toml");
        std::fs::write(&garbled, "[limits\nmax_members = ").unwrap();
        let err = Config::from_file(&garbled).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(err.category(), OutcomeCategory::InvalidInput);

        let mut config = Config::default();
        config.limits.max_admins = 30;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert_eq!(err.category(), OutcomeCategory::InvalidInput);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parley.toml");

        let mut config = Config::default();
        config.limits.max_members = 10;
        config.save_to_file(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.limits.max_members, 10);
        assert_eq!(reloaded.store.busy_timeout, config.store.busy_timeout);
    }
}
