//! Resolving request credentials to users
//!
//! Authentication itself happens before requests reach this crate. The
//! resolver only turns whatever the request layer carries into a [`UserId`]
//! that the membership and messaging operations accept.

use crate::model::UserId;
use crate::outcome::OutcomeCategory;
use crate::storage::{ChatStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Missing credential")]
    MissingCredential,

    #[error("Unknown credential: {0}")]
    UnknownCredential(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl IdentityError {
    pub fn category(&self) -> OutcomeCategory {
        match self {
            IdentityError::MissingCredential | IdentityError::UnknownCredential(_) => {
                OutcomeCategory::NotAuthorized
            }
            IdentityError::Storage(e) => e.category(),
        }
    }
}

pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, credential: &str) -> Result<UserId, IdentityError>;
}

/// Resolves a numeric user id or a username against the user directory
pub struct DirectoryResolver<S> {
    store: Arc<S>,
}

impl<S: ChatStore> DirectoryResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: ChatStore> IdentityResolver for DirectoryResolver<S> {
    fn resolve(&self, credential: &str) -> Result<UserId, IdentityError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(IdentityError::MissingCredential);
        }

        let user = match credential.parse::<UserId>() {
            Ok(id) => self.store.find_user(id)?,
            Err(_) => self.store.find_user_by_username(credential)?,
        };

        match user {
            Some(user) => Ok(user.id),
            None => {
                warn!(credential = %credential, "credential did not resolve to a user");
                Err(IdentityError::UnknownCredential(credential.to_string()))
            }
        }
    }
}
