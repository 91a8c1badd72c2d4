//! Message edit error types

use crate::model::VersionStamp;
use crate::outcome::OutcomeCategory;
use crate::storage::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Only the sender can edit this message")]
    Forbidden,

    #[error("Edit window of {}s has closed", .window.as_secs())]
    EditWindowExpired { window: Duration },

    #[error("Message has been updated elsewhere since {supplied}; refresh and try again")]
    StaleVersion { supplied: VersionStamp },

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl EditError {
    pub fn category(&self) -> OutcomeCategory {
        match self {
            EditError::Forbidden => OutcomeCategory::Forbidden,
            EditError::EditWindowExpired { .. } => OutcomeCategory::Expired,
            EditError::StaleVersion { .. } => OutcomeCategory::StaleVersion,
            EditError::Storage(e) => e.category(),
        }
    }
}
