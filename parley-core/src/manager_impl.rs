//! Manager trait implementations
//!
//! Every membership change runs its existence checks, the invariant guard
//! and the registry write inside one [`ChatStore::group_transaction`], so the
//! counts the guard reads are still true when the row is written.

use crate::clock::{Clock, SystemClock};
use crate::config::LimitsConfig;
use crate::manager::{ChatError, ChatResult, GroupManager, MessageManager};
use crate::membership::{GroupInvariantGuard, MembershipError};
use crate::messaging::MessageEditProtocol;
use crate::model::{
    Conversation, EditableMessage, Group, GroupId, GroupStats, Membership, MessageId, MessageKind,
    NewMessage, User, UserId, VersionStamp, MAX_GROUP_NAME_LEN,
};
use crate::storage::{ChatStore, StoreError};
use crate::summary::SummaryRequest;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Manager implementation over any [`ChatStore`]
pub struct ChatManagerImpl<S> {
    store: Arc<S>,
    guard: GroupInvariantGuard,
    edits: MessageEditProtocol,
    clock: Arc<dyn Clock>,
    summary_limit: u32,
}

impl<S: ChatStore> ChatManagerImpl<S> {
    pub fn new(store: Arc<S>, limits: &LimitsConfig) -> Self {
        Self::with_clock(store, limits, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, limits: &LimitsConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            guard: GroupInvariantGuard::new(limits.group_limits()),
            edits: MessageEditProtocol::new(limits.edit_window),
            clock,
            summary_limit: limits.summary_message_limit,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn validate_group_name(name: &str) -> ChatResult<&str> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_GROUP_NAME_LEN {
            return Err(ChatError::InvalidName {
                max: MAX_GROUP_NAME_LEN,
            });
        }
        Ok(name)
    }

    fn require_content(content: &str) -> ChatResult<()> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyContent);
        }
        Ok(())
    }

    fn require_group(&self, group_id: GroupId) -> ChatResult<Group> {
        self.store
            .find_group(group_id)?
            .ok_or(ChatError::GroupNotFound(group_id))
    }

    fn require_user(&self, user_id: UserId) -> ChatResult<User> {
        self.store
            .find_user(user_id)?
            .ok_or(ChatError::UserNotFound(user_id))
    }

    fn require_member(&self, group_id: GroupId, user_id: UserId) -> ChatResult<Membership> {
        self.require_group(group_id)?;
        self.store
            .find_membership(group_id, user_id)?
            .ok_or(ChatError::NotGroupMember)
    }

    /// Collect the transcript a summarizer needs. Members only.
    pub fn summary_request(&self, requester: UserId, group_id: GroupId) -> ChatResult<SummaryRequest> {
        self.require_member(group_id, requester)?;

        let lines = self.store.recent_group_messages(group_id, self.summary_limit)?;
        debug!(group_id = %group_id, lines = lines.len(), "collected transcript");
        Ok(SummaryRequest::new(group_id, lines))
    }

    fn try_edit(
        &self,
        kind: MessageKind,
        id: MessageId,
        requester: UserId,
        supplied: VersionStamp,
        content: &str,
    ) -> ChatResult<EditableMessage> {
        Self::require_content(content)?;
        let message = self.get_message(kind, id)?;

        let now = self.clock.now();
        let decision = self.edits.authorize_edit(&message, requester, supplied, now)?;
        self.store
            .commit_edit(&decision, content, now)
            .map_err(|e| ChatError::Edit(decision.conflict(e)))
    }
}

fn rejected(operation: &'static str) -> impl Fn(&ChatError) {
    move |err: &ChatError| {
        warn!(
            operation,
            category = %err.category(),
            error = %err,
            "request rejected"
        );
    }
}

impl<S: ChatStore> GroupManager for ChatManagerImpl<S> {
    fn register_user(&self, username: &str) -> ChatResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ChatError::InvalidUsername);
        }

        let user = self
            .store
            .insert_user(username, self.clock.now())
            .map_err(|e| match e {
                StoreError::Duplicate(_) => ChatError::UsernameTaken(username.to_string()),
                other => ChatError::Store(other),
            })
            .inspect_err(rejected("register_user"))?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    fn create_group(&self, creator: UserId, name: &str) -> ChatResult<Group> {
        let name = Self::validate_group_name(name).inspect_err(rejected("create_group"))?;
        let now = self.clock.now();

        let group = self
            .store
            .group_transaction(|tx| -> ChatResult<Group> {
                if tx.find_user(creator)?.is_none() {
                    return Err(ChatError::UserNotFound(creator));
                }

                let group = tx.insert_group(name, creator, now).map_err(|e| match e {
                    StoreError::Duplicate(_) => ChatError::NameTaken(name.to_string()),
                    other => ChatError::Store(other),
                })?;

                let decision = self.guard.authorize_bootstrap(&*tx, group.id, creator)?;
                tx.apply(&decision, now).map_err(MembershipError::from)?;
                Ok(group)
            })
            .inspect_err(rejected("create_group"))?;

        info!(group_id = %group.id, name = %group.name, creator = %creator, "group created");
        Ok(group)
    }

    fn get_group(&self, group_id: GroupId) -> ChatResult<Group> {
        self.require_group(group_id)
    }

    fn add_member(
        &self,
        requester: UserId,
        group_id: GroupId,
        target: UserId,
        as_admin: bool,
    ) -> ChatResult<Membership> {
        let now = self.clock.now();

        let membership = self
            .store
            .group_transaction(|tx| -> ChatResult<Membership> {
                tx.find_group(group_id)?.ok_or(ChatError::GroupNotFound(group_id))?;

                let decision =
                    self.guard
                        .authorize_add_member(&*tx, group_id, requester, target, as_admin)?;
                tx.find_user(target)?.ok_or(ChatError::UserNotFound(target))?;
                Ok(tx.apply(&decision, now).map_err(MembershipError::from)?)
            })
            .inspect_err(rejected("add_member"))?;

        info!(
            group_id = %group_id,
            requester = %requester,
            user_id = %target,
            is_admin = membership.is_admin,
            "member added"
        );
        Ok(membership)
    }

    fn promote_admin(&self, requester: UserId, group_id: GroupId, target: UserId) -> ChatResult<Membership> {
        let now = self.clock.now();

        let membership = self
            .store
            .group_transaction(|tx| -> ChatResult<Membership> {
                tx.find_group(group_id)?.ok_or(ChatError::GroupNotFound(group_id))?;

                let decision = self.guard.authorize_promote(&*tx, group_id, requester, target)?;
                Ok(tx.apply(&decision, now).map_err(MembershipError::from)?)
            })
            .inspect_err(rejected("promote_admin"))?;

        info!(group_id = %group_id, requester = %requester, user_id = %target, "member promoted");
        Ok(membership)
    }

    fn group_stats(&self, group_id: GroupId) -> ChatResult<GroupStats> {
        self.require_group(group_id)?;
        Ok(self.store.group_stats(group_id)?)
    }
}

impl<S: ChatStore> MessageManager for ChatManagerImpl<S> {
    fn send_direct_message(
        &self,
        sender: UserId,
        receiver: UserId,
        content: &str,
    ) -> ChatResult<EditableMessage> {
        Self::require_content(content)
            .and_then(|_| self.require_user(receiver))
            .inspect_err(rejected("send_direct_message"))?;

        let message = self.store.insert_message(&NewMessage {
            conversation: Conversation::Direct { receiver_id: receiver },
            sender_id: sender,
            content: content.to_string(),
            created_at: self.clock.now(),
        })?;

        info!(message_id = %message.id, sender = %sender, receiver = %receiver, "direct message sent");
        Ok(message)
    }

    fn send_group_message(
        &self,
        sender: UserId,
        group_id: GroupId,
        content: &str,
    ) -> ChatResult<EditableMessage> {
        Self::require_content(content)
            .and_then(|_| self.require_member(group_id, sender))
            .inspect_err(rejected("send_group_message"))?;

        let message = self.store.insert_message(&NewMessage {
            conversation: Conversation::Group { group_id },
            sender_id: sender,
            content: content.to_string(),
            created_at: self.clock.now(),
        })?;

        info!(message_id = %message.id, sender = %sender, group_id = %group_id, "group message sent");
        Ok(message)
    }

    fn get_message(&self, kind: MessageKind, id: MessageId) -> ChatResult<EditableMessage> {
        self.store
            .find_message(kind, id)?
            .ok_or(ChatError::MessageNotFound { kind, id })
    }

    fn edit_message(
        &self,
        kind: MessageKind,
        id: MessageId,
        requester: UserId,
        supplied: VersionStamp,
        content: &str,
    ) -> ChatResult<EditableMessage> {
        let edited = self
            .try_edit(kind, id, requester, supplied, content)
            .inspect_err(rejected("edit_message"))?;
        info!(
            kind = %kind,
            message_id = %id,
            editor = %requester,
            version = %edited.version,
            "message edited"
        );
        Ok(edited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::Timestamp;
    use crate::storage::MemoryChatStore;

    fn manager() -> ChatManagerImpl<MemoryChatStore> {
        ChatManagerImpl::with_clock(
            Arc::new(MemoryChatStore::new()),
            &LimitsConfig::default(),
            Arc::new(ManualClock::new(Timestamp::from_millis(1_000))),
        )
    }

    #[test]
    fn test_create_group_bootstraps_creator() {
        let manager = manager();
        let alice = manager.register_user("alice").unwrap();

        let group = manager.create_group(alice.id, "  general ").unwrap();
        assert_eq!(group.name, "general");

        let stats = manager.group_stats(group.id).unwrap();
        assert_eq!((stats.members, stats.admins), (1, 1));
    }

    #[test]
    fn test_group_name_rules() {
        let manager = manager();
        let alice = manager.register_user("alice").unwrap();

        assert!(matches!(manager.create_group(alice.id, "   "), Err(ChatError::InvalidName { .. })));
        let long = "x".repeat(MAX_GROUP_NAME_LEN + 1);
        assert!(matches!(manager.create_group(alice.id, &long), Err(ChatError::InvalidName { .. })));

        manager.create_group(alice.id, "general").unwrap();
        assert!(matches!(manager.create_group(alice.id, "general"), Err(ChatError::NameTaken(_))));
    }

    #[test]
    fn test_unknown_creator_leaves_no_group() {
        let manager = manager();
        let result = manager.create_group(UserId::new(77), "ghosts");

        assert!(matches!(result, Err(ChatError::UserNotFound(_))));
        assert!(manager.store().find_group_by_name("ghosts").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username() {
        let manager = manager();
        manager.register_user("alice").unwrap();
        assert!(matches!(manager.register_user("alice"), Err(ChatError::UsernameTaken(_))));
        assert!(matches!(manager.register_user(" "), Err(ChatError::InvalidUsername)));
    }

    #[test]
    fn test_add_member_requires_admin() {
        let manager = manager();
        let alice = manager.register_user("alice").unwrap();
        let bob = manager.register_user("bob").unwrap();
        let carol = manager.register_user("carol").unwrap();
        let group = manager.create_group(alice.id, "general").unwrap();

        manager.add_member(alice.id, group.id, bob.id, false).unwrap();
        let result = manager.add_member(bob.id, group.id, carol.id, false);
        assert!(matches!(
            result,
            Err(ChatError::Membership(MembershipError::NotAuthorized))
        ));

        let result = manager.add_member(alice.id, group.id, UserId::new(99), false);
        assert!(matches!(result, Err(ChatError::UserNotFound(_))));
    }

    #[test]
    fn test_unknown_target_hidden_from_non_admins() {
        let manager = manager();
        let alice = manager.register_user("alice").unwrap();
        let bob = manager.register_user("bob").unwrap();
        let group = manager.create_group(alice.id, "general").unwrap();
        manager.add_member(alice.id, group.id, bob.id, false).unwrap();

        let unknown = UserId::new(9999);
        assert!(matches!(
            manager.promote_admin(bob.id, group.id, unknown),
            Err(ChatError::Membership(MembershipError::NotAuthorized))
        ));
        assert!(matches!(
            manager.add_member(bob.id, group.id, unknown, false),
            Err(ChatError::Membership(MembershipError::NotAuthorized))
        ));
    }

    #[test]
    fn test_group_message_requires_membership() {
        let manager = manager();
        let alice = manager.register_user("alice").unwrap();
        let mallory = manager.register_user("mallory").unwrap();
        let group = manager.create_group(alice.id, "general").unwrap();

        assert!(manager.send_group_message(alice.id, group.id, "hello").is_ok());
        assert!(matches!(
            manager.send_group_message(mallory.id, group.id, "hi"),
            Err(ChatError::NotGroupMember)
        ));
        assert!(matches!(
            manager.send_group_message(alice.id, GroupId::new(999), "hi"),
            Err(ChatError::GroupNotFound(_))
        ));
        assert!(matches!(
            manager.send_group_message(alice.id, group.id, "  "),
            Err(ChatError::EmptyContent)
        ));
    }

    #[test]
    fn test_direct_message_needs_receiver() {
        let manager = manager();
        let alice = manager.register_user("alice").unwrap();

        let result = manager.send_direct_message(alice.id, UserId::new(404), "hi");
        assert!(matches!(result, Err(ChatError::UserNotFound(_))));
    }

    #[test]
    fn test_missing_message() {
        let manager = manager();
        let err = manager.get_message(MessageKind::Group, MessageId::new(5)).unwrap_err();
        assert_eq!(err.category().status_code(), 404);
    }

    #[test]
    fn test_summary_request_members_only() {
        let manager = manager();
        let alice = manager.register_user("alice").unwrap();
        let bob = manager.register_user("bob").unwrap();
        let group = manager.create_group(alice.id, "general").unwrap();

        let request = manager.summary_request(alice.id, group.id).unwrap();
        assert!(request.is_empty());

        manager.send_group_message(alice.id, group.id, "lunch at noon").unwrap();
        let request = manager.summary_request(alice.id, group.id).unwrap();
        assert_eq!(request.participants(), vec!["alice".to_string()]);

        assert!(matches!(
            manager.summary_request(bob.id, group.id),
            Err(ChatError::NotGroupMember)
        ));
    }
}
