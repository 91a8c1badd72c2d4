//! Stable outcome categories handed to the request layer
//!
//! Every error in this crate maps onto one [`OutcomeCategory`]. The boundary
//! translates the category into a transport status; [`OutcomeCategory::status_code`]
//! gives the HTTP mapping the backend has always used.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeCategory {
    Success,
    /// Caller lacks the role or membership the operation requires
    NotAuthorized,
    /// Member or admin limit reached
    CapacityExceeded,
    /// Target already holds the requested status, or a unique key is taken
    Duplicate,
    /// Malformed request: empty content, bad name, promoting a non-member
    InvalidInput,
    /// Caller is not the author of the message
    Forbidden,
    /// Edit window has closed
    Expired,
    /// Supplied version stamp is not the current one
    StaleVersion,
    NotFound,
    /// Storage or collaborator failure; nothing was written
    Internal,
}

impl OutcomeCategory {
    pub fn status_code(&self) -> u16 {
        match self {
            OutcomeCategory::Success => 200,
            OutcomeCategory::NotAuthorized => 401,
            OutcomeCategory::CapacityExceeded => 400,
            OutcomeCategory::Duplicate => 400,
            OutcomeCategory::InvalidInput => 400,
            OutcomeCategory::Forbidden => 403,
            OutcomeCategory::Expired => 403,
            OutcomeCategory::StaleVersion => 409,
            OutcomeCategory::NotFound => 404,
            OutcomeCategory::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeCategory::Success => "success",
            OutcomeCategory::NotAuthorized => "not-authorized",
            OutcomeCategory::CapacityExceeded => "capacity-exceeded",
            OutcomeCategory::Duplicate => "duplicate",
            OutcomeCategory::InvalidInput => "invalid-input",
            OutcomeCategory::Forbidden => "forbidden",
            OutcomeCategory::Expired => "expired",
            OutcomeCategory::StaleVersion => "stale-version",
            OutcomeCategory::NotFound => "not-found",
            OutcomeCategory::Internal => "internal",
        }
    }
}

impl fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
