//! Users, groups and group memberships

use super::types::{GroupId, MembershipId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Maximum length of a group name, in characters
pub const MAX_GROUP_NAME_LEN: usize = 100;

/// A registered user. Credentials live outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Globally unique handle
    pub username: String,

    pub created_at: Timestamp,
}

/// A named group conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,

    /// Globally unique name
    pub name: String,

    /// The user that created the group and was bootstrapped as its first admin
    pub created_by: UserId,

    pub created_at: Timestamp,
}

/// A (group, user) membership row.
///
/// At most one exists per pair; the admin flag only ever flips from `false`
/// to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub is_admin: bool,
    pub joined_at: Timestamp,
}

/// Point-in-time membership counts for a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub group_id: GroupId,
    pub members: u32,
    pub admins: u32,
}
