//! In-memory chat store
//!
//! A single mutex serializes every operation. Group transactions run against
//! a copy of the state which replaces the original only when the closure
//! returns `Ok`.

use super::error::{StoreError, StoreResult};
use super::{ChatStore, GroupTransaction};
use crate::membership::MembershipRegistry;
use crate::messaging::EditDecision;
use crate::model::{
    Conversation, EditableMessage, Group, GroupId, GroupStats, Membership, MembershipId, MessageId,
    MessageKind, NewMessage, Timestamp, User, UserId, VersionStamp,
};
use crate::summary::TranscriptLine;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    memberships: BTreeMap<(GroupId, UserId), Membership>,
    direct_messages: BTreeMap<MessageId, EditableMessage>,
    group_messages: BTreeMap<MessageId, EditableMessage>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn messages(&self, kind: MessageKind) -> &BTreeMap<MessageId, EditableMessage> {
        match kind {
            MessageKind::Direct => &self.direct_messages,
            MessageKind::Group => &self.group_messages,
        }
    }

    fn messages_mut(&mut self, kind: MessageKind) -> &mut BTreeMap<MessageId, EditableMessage> {
        match kind {
            MessageKind::Direct => &mut self.direct_messages,
            MessageKind::Group => &mut self.group_messages,
        }
    }

    fn stats(&self, group_id: GroupId) -> GroupStats {
        let mut stats = GroupStats {
            group_id,
            members: 0,
            admins: 0,
        };
        for membership in self.memberships.values().filter(|m| m.group_id == group_id) {
            stats.members += 1;
            if membership.is_admin {
                stats.admins += 1;
            }
        }
        stats
    }
}

impl MembershipRegistry for MemoryState {
    fn find(&self, group_id: GroupId, user_id: UserId) -> StoreResult<Option<Membership>> {
        Ok(self.memberships.get(&(group_id, user_id)).cloned())
    }

    fn count(&self, group_id: GroupId) -> StoreResult<u32> {
        Ok(self.stats(group_id).members)
    }

    fn admin_count(&self, group_id: GroupId) -> StoreResult<u32> {
        Ok(self.stats(group_id).admins)
    }

    fn insert(
        &mut self,
        group_id: GroupId,
        user_id: UserId,
        is_admin: bool,
        joined_at: Timestamp,
    ) -> StoreResult<Membership> {
        if self.memberships.contains_key(&(group_id, user_id)) {
            return Err(StoreError::Duplicate(format!(
                "membership ({}, {})",
                group_id, user_id
            )));
        }

        let membership = Membership {
            id: MembershipId::new(self.allocate_id()),
            group_id,
            user_id,
            is_admin,
            joined_at,
        };
        self.memberships.insert((group_id, user_id), membership.clone());
        Ok(membership)
    }

    fn set_admin(&mut self, membership_id: MembershipId) -> StoreResult<()> {
        let membership = self
            .memberships
            .values_mut()
            .find(|m| m.id == membership_id)
            .ok_or(StoreError::NotFound)?;
        membership.is_admin = true;
        Ok(())
    }
}

impl GroupTransaction for MemoryState {
    fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users.get(&user_id).cloned())
    }

    fn find_group(&self, group_id: GroupId) -> StoreResult<Option<Group>> {
        Ok(self.groups.get(&group_id).cloned())
    }

    fn insert_group(
        &mut self,
        name: &str,
        created_by: UserId,
        created_at: Timestamp,
    ) -> StoreResult<Group> {
        if self.groups.values().any(|g| g.name == name) {
            return Err(StoreError::Duplicate(format!("group name {}", name)));
        }

        let group = Group {
            id: GroupId::new(self.allocate_id()),
            name: name.to_string(),
            created_by,
            created_at,
        };
        self.groups.insert(group.id, group.clone());
        Ok(group)
    }
}

/// Chat store kept entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    state: Mutex<MemoryState>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ChatStore for MemoryChatStore {
    fn group_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn GroupTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut state = self.lock()?;
        let mut scratch = state.clone();

        let value = f(&mut scratch)?;

        *state = scratch;
        Ok(value)
    }

    fn insert_user(&self, username: &str, created_at: Timestamp) -> StoreResult<User> {
        let mut state = self.lock()?;
        if state.users.values().any(|u| u.username == username) {
            return Err(StoreError::Duplicate(format!("username {}", username)));
        }

        let user = User {
            id: UserId::new(state.allocate_id()),
            username: username.to_string(),
            created_at,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn find_group(&self, group_id: GroupId) -> StoreResult<Option<Group>> {
        Ok(self.lock()?.groups.get(&group_id).cloned())
    }

    fn find_group_by_name(&self, name: &str) -> StoreResult<Option<Group>> {
        Ok(self.lock()?.groups.values().find(|g| g.name == name).cloned())
    }

    fn find_membership(&self, group_id: GroupId, user_id: UserId) -> StoreResult<Option<Membership>> {
        Ok(self.lock()?.memberships.get(&(group_id, user_id)).cloned())
    }

    fn group_stats(&self, group_id: GroupId) -> StoreResult<GroupStats> {
        Ok(self.lock()?.stats(group_id))
    }

    fn insert_message(&self, message: &NewMessage) -> StoreResult<EditableMessage> {
        let mut state = self.lock()?;
        let stored = EditableMessage {
            id: MessageId::new(state.allocate_id()),
            conversation: message.conversation,
            sender_id: message.sender_id,
            content: message.content.clone(),
            created_at: message.created_at,
            version: VersionStamp::INITIAL,
        };

        state
            .messages_mut(message.conversation.kind())
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn find_message(&self, kind: MessageKind, id: MessageId) -> StoreResult<Option<EditableMessage>> {
        Ok(self.lock()?.messages(kind).get(&id).cloned())
    }

    fn commit_edit(
        &self,
        decision: &EditDecision,
        content: &str,
        _now: Timestamp,
    ) -> StoreResult<EditableMessage> {
        let mut state = self.lock()?;
        let message = state
            .messages_mut(decision.kind)
            .get_mut(&decision.message_id)
            .ok_or(StoreError::NotFound)?;

        if message.version != decision.expected {
            return Err(StoreError::VersionConflict);
        }

        message.content = content.to_string();
        message.version = message.version.next();
        Ok(message.clone())
    }

    fn recent_group_messages(&self, group_id: GroupId, limit: u32) -> StoreResult<Vec<TranscriptLine>> {
        let state = self.lock()?;

        let mut messages: Vec<&EditableMessage> = state
            .group_messages
            .values()
            .filter(|m| m.conversation == Conversation::Group { group_id })
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));

        let skip = messages.len().saturating_sub(limit as usize);
        Ok(messages
            .into_iter()
            .skip(skip)
            .map(|m| TranscriptLine {
                sender: state
                    .users
                    .get(&m.sender_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_else(|| m.sender_id.to_string()),
                content: m.content.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_transaction_leaves_state_untouched() {
        let store = MemoryChatStore::new();
        let alice = store.insert_user("alice", Timestamp::from_millis(1)).unwrap();

        let result: Result<(), StoreError> = store.group_transaction(|tx| {
            let group = tx.insert_group("general", alice.id, Timestamp::from_millis(2))?;
            tx.insert(group.id, alice.id, true, Timestamp::from_millis(2))?;
            Err(StoreError::NotFound)
        });

        assert!(result.is_err());
        assert!(store.find_group_by_name("general").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_membership_rejected() {
        let store = MemoryChatStore::new();
        let alice = store.insert_user("alice", Timestamp::from_millis(1)).unwrap();

        let result: Result<(), StoreError> = store.group_transaction(|tx| {
            let group = tx.insert_group("general", alice.id, Timestamp::from_millis(2))?;
            tx.insert(group.id, alice.id, true, Timestamp::from_millis(2))?;
            tx.insert(group.id, alice.id, false, Timestamp::from_millis(3))?;
            Ok(())
        });

        assert!(matches!(result, Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn test_commit_edit_checks_version() {
        let store = MemoryChatStore::new();
        let alice = store.insert_user("alice", Timestamp::from_millis(1)).unwrap();
        let bob = store.insert_user("bob", Timestamp::from_millis(1)).unwrap();
        let message = store
            .insert_message(&NewMessage {
                conversation: Conversation::Direct { receiver_id: bob.id },
                sender_id: alice.id,
                content: "A".to_string(),
                created_at: Timestamp::from_millis(10),
            })
            .unwrap();

        let decision = EditDecision {
            kind: MessageKind::Direct,
            message_id: message.id,
            expected: VersionStamp::INITIAL,
        };
        let edited = store.commit_edit(&decision, "B", Timestamp::from_millis(20)).unwrap();
        assert_eq!(edited.version, VersionStamp::new(2));

        assert!(matches!(
            store.commit_edit(&decision, "C", Timestamp::from_millis(30)),
            Err(StoreError::VersionConflict)
        ));
    }
}
