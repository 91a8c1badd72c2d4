//! Persistence for users, groups, memberships and messages
//!
//! [`ChatStore`] is the seam between the domain layer and storage. It is
//! passed explicitly to the manager so the guard and the edit protocol can
//! run against [`MemoryChatStore`] in tests and [`ChatSqlStore`] in
//! production.

pub mod error;
pub mod memory_store;
pub mod migrations;
pub mod sql_store;

pub use error::{StoreError, StoreResult};
pub use memory_store::MemoryChatStore;
pub use migrations::{migrate, CURRENT_SCHEMA_VERSION};
pub use sql_store::ChatSqlStore;

use crate::membership::MembershipRegistry;
use crate::messaging::EditDecision;
use crate::model::{
    EditableMessage, Group, GroupId, GroupStats, Membership, MessageId, MessageKind, NewMessage,
    Timestamp, User, UserId,
};
use crate::summary::TranscriptLine;

/// Everything visible inside a group transaction.
///
/// Reads observe the state as of the start of the transaction plus its own
/// writes; nothing else can write to the store until it ends.
pub trait GroupTransaction: MembershipRegistry {
    fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    fn find_group(&self, group_id: GroupId) -> StoreResult<Option<Group>>;

    /// Insert a group. Fails with `StoreError::Duplicate` if the name is taken.
    fn insert_group(
        &mut self,
        name: &str,
        created_by: UserId,
        created_at: Timestamp,
    ) -> StoreResult<Group>;
}

pub trait ChatStore: Send + Sync {
    /// Run `f` inside one serializing write transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; on `Err` every write
    /// made through the scope is discarded.
    fn group_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn GroupTransaction) -> Result<T, E>,
        E: From<StoreError>;

    /// Insert a user. Fails with `StoreError::Duplicate` if the username is taken.
    fn insert_user(&self, username: &str, created_at: Timestamp) -> StoreResult<User>;

    fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    fn find_group(&self, group_id: GroupId) -> StoreResult<Option<Group>>;

    fn find_group_by_name(&self, name: &str) -> StoreResult<Option<Group>>;

    fn find_membership(&self, group_id: GroupId, user_id: UserId) -> StoreResult<Option<Membership>>;

    /// Member and admin counts taken from one consistent read
    fn group_stats(&self, group_id: GroupId) -> StoreResult<GroupStats>;

    /// Store a new message at [`VersionStamp::INITIAL`](crate::model::VersionStamp::INITIAL)
    fn insert_message(&self, message: &NewMessage) -> StoreResult<EditableMessage>;

    fn find_message(&self, kind: MessageKind, id: MessageId) -> StoreResult<Option<EditableMessage>>;

    /// Conditionally replace content and advance the version stamp.
    ///
    /// Fails with `StoreError::VersionConflict` if the stored version no
    /// longer equals `decision.expected`.
    fn commit_edit(
        &self,
        decision: &EditDecision,
        content: &str,
        now: Timestamp,
    ) -> StoreResult<EditableMessage>;

    /// Most recent group messages with sender usernames, oldest first
    fn recent_group_messages(&self, group_id: GroupId, limit: u32) -> StoreResult<Vec<TranscriptLine>>;
}
