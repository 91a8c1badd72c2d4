//! Storage error types

use crate::outcome::OutcomeCategory;
use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A conditional update matched no row at the expected version
    #[error("Version conflict")]
    VersionConflict,

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn category(&self) -> OutcomeCategory {
        match self {
            StoreError::NotFound => OutcomeCategory::NotFound,
            StoreError::Duplicate(_) => OutcomeCategory::Duplicate,
            StoreError::VersionConflict => OutcomeCategory::StaleVersion,
            StoreError::Pool(_) | StoreError::Sqlite(_) | StoreError::Poisoned => {
                OutcomeCategory::Internal
            }
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                return StoreError::Duplicate(
                    message.clone().unwrap_or_else(|| "unique constraint failed".to_string()),
                );
            }
        }

        match err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Sqlite(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
