//! Errors raised while loading or saving a [`Config`](super::Config)

use crate::outcome::OutcomeCategory;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot encode config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{key} holds an invalid {what}: {reason}")]
    InvalidEnv {
        key: &'static str,
        what: &'static str,
        reason: String,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn category(&self) -> OutcomeCategory {
        match self {
            ConfigError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                OutcomeCategory::NotFound
            }
            ConfigError::Parse(_) | ConfigError::InvalidEnv { .. } | ConfigError::Invalid(_) => {
                OutcomeCategory::InvalidInput
            }
            ConfigError::Read { .. } | ConfigError::Write { .. } | ConfigError::Serialize(_) => {
                OutcomeCategory::Internal
            }
        }
    }
}
