//! Membership error types

use crate::outcome::OutcomeCategory;
use crate::storage::StoreError;
use thiserror::Error;

/// Which capacity limit a change would break
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityKind {
    Members,
    Admins,
}

/// Outcomes of guarded membership changes
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("Only group admins can change membership")]
    NotAuthorized,

    #[error("Group already has {limit} {kind}")]
    CapacityExceeded { kind: &'static str, limit: u32 },

    #[error("User is already a member")]
    AlreadyMember,

    #[error("User is already an admin")]
    AlreadyAdmin,

    #[error("User must be a group member to be promoted")]
    TargetNotMember,

    /// The (group, user) unique key rejected the write
    #[error("Duplicate membership: {0}")]
    Duplicate(String),

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl MembershipError {
    pub fn capacity(kind: CapacityKind, limit: u32) -> Self {
        let kind = match kind {
            CapacityKind::Members => "members",
            CapacityKind::Admins => "admins",
        };
        MembershipError::CapacityExceeded { kind, limit }
    }

    pub fn category(&self) -> OutcomeCategory {
        match self {
            MembershipError::NotAuthorized => OutcomeCategory::NotAuthorized,
            MembershipError::CapacityExceeded { .. } => OutcomeCategory::CapacityExceeded,
            MembershipError::AlreadyMember
            | MembershipError::AlreadyAdmin
            | MembershipError::Duplicate(_) => OutcomeCategory::Duplicate,
            MembershipError::TargetNotMember => OutcomeCategory::InvalidInput,
            MembershipError::Storage(e) => e.category(),
        }
    }
}

impl From<StoreError> for MembershipError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => MembershipError::Duplicate(what),
            other => MembershipError::Storage(other),
        }
    }
}
