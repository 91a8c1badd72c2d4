//! Manager traits for group and message operations

use crate::identity::IdentityError;
use crate::membership::MembershipError;
use crate::messaging::EditError;
use crate::model::{
    EditableMessage, Group, GroupId, GroupStats, Membership, MessageId, MessageKind, User, UserId,
    VersionStamp,
};
use crate::outcome::OutcomeCategory;
use crate::storage::StoreError;
use crate::summary::SummaryError;
use thiserror::Error;

/// Errors surfaced by the manager layer
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Group name must be between 1 and {max} characters")]
    InvalidName { max: usize },

    #[error("Username must not be empty")]
    InvalidUsername,

    #[error("Group name already taken: {0}")]
    NameTaken(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("Message not found: {kind} {id}")]
    MessageNotFound { kind: MessageKind, id: MessageId },

    #[error("You are not a member of this group")]
    NotGroupMember,

    #[error(transparent)]
    Membership(#[from] MembershipError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl ChatError {
    pub fn category(&self) -> OutcomeCategory {
        match self {
            ChatError::InvalidName { .. } | ChatError::InvalidUsername | ChatError::EmptyContent => {
                OutcomeCategory::InvalidInput
            }
            ChatError::NameTaken(_) | ChatError::UsernameTaken(_) => OutcomeCategory::Duplicate,
            ChatError::UserNotFound(_)
            | ChatError::GroupNotFound(_)
            | ChatError::MessageNotFound { .. } => OutcomeCategory::NotFound,
            ChatError::NotGroupMember => OutcomeCategory::NotAuthorized,
            ChatError::Membership(e) => e.category(),
            ChatError::Edit(e) => e.category(),
            ChatError::Identity(e) => e.category(),
            ChatError::Store(e) => e.category(),
            ChatError::Summary(_) | ChatError::Task(_) => OutcomeCategory::Internal,
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Manager for users, groups and memberships
pub trait GroupManager {
    /// Register a user with a unique username
    fn register_user(&self, username: &str) -> ChatResult<User>;

    /// Create a group and admit its creator as the first admin
    fn create_group(&self, creator: UserId, name: &str) -> ChatResult<Group>;

    fn get_group(&self, group_id: GroupId) -> ChatResult<Group>;

    /// Add `target` to a group on behalf of an admin
    fn add_member(
        &self,
        requester: UserId,
        group_id: GroupId,
        target: UserId,
        as_admin: bool,
    ) -> ChatResult<Membership>;

    /// Raise an existing member to admin on behalf of an admin
    fn promote_admin(&self, requester: UserId, group_id: GroupId, target: UserId) -> ChatResult<Membership>;

    fn group_stats(&self, group_id: GroupId) -> ChatResult<GroupStats>;
}

/// Manager for direct and group messages
pub trait MessageManager {
    fn send_direct_message(
        &self,
        sender: UserId,
        receiver: UserId,
        content: &str,
    ) -> ChatResult<EditableMessage>;

    /// Post to a group. Only members may post.
    fn send_group_message(
        &self,
        sender: UserId,
        group_id: GroupId,
        content: &str,
    ) -> ChatResult<EditableMessage>;

    /// Fetch a message together with its current version stamp
    fn get_message(&self, kind: MessageKind, id: MessageId) -> ChatResult<EditableMessage>;

    /// Replace the content of a message the requester sent
    fn edit_message(
        &self,
        kind: MessageKind,
        id: MessageId,
        requester: UserId,
        supplied: VersionStamp,
        content: &str,
    ) -> ChatResult<EditableMessage>;
}
