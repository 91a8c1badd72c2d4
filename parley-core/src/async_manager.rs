//! Async facade over [`ChatManagerImpl`]
//!
//! SQLite calls block, so every operation runs on tokio's blocking pool.
//! Each call is an independent worker; the store's transactions are the only
//! coordination between them.

use crate::identity::IdentityResolver;
use crate::manager::{ChatError, ChatResult, GroupManager, MessageManager};
use crate::manager_impl::ChatManagerImpl;
use crate::model::{
    EditableMessage, Group, GroupId, GroupStats, Membership, MessageId, MessageKind, User, UserId,
    VersionStamp,
};
use crate::storage::ChatStore;
use crate::summary::{GroupSummary, SummaryError, Summarizer, EMPTY_SUMMARY};
use std::sync::Arc;
use tracing::{debug, info};

pub struct AsyncChatManager<S> {
    manager: Arc<ChatManagerImpl<S>>,
}

impl<S> Clone for AsyncChatManager<S> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<S: ChatStore + 'static> AsyncChatManager<S> {
    pub fn new(manager: ChatManagerImpl<S>) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }

    /// The synchronous manager, for callers already off the async runtime
    pub fn inner(&self) -> &ChatManagerImpl<S> {
        &self.manager
    }

    async fn run<T, F>(&self, op: F) -> ChatResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ChatManagerImpl<S>) -> ChatResult<T> + Send + 'static,
    {
        let manager = Arc::clone(&self.manager);
        tokio::task::spawn_blocking(move || op(&manager))
            .await
            .map_err(|e| ChatError::Task(e.to_string()))?
    }

    /// Turn a caller credential into a user id on the blocking pool
    pub async fn resolve_caller<R>(&self, resolver: &Arc<R>, credential: &str) -> ChatResult<UserId>
    where
        R: IdentityResolver + 'static,
    {
        let resolver = Arc::clone(resolver);
        let credential = credential.to_string();
        let user_id = tokio::task::spawn_blocking(move || resolver.resolve(&credential))
            .await
            .map_err(|e| ChatError::Task(e.to_string()))??;
        Ok(user_id)
    }

    pub async fn register_user(&self, username: &str) -> ChatResult<User> {
        let username = username.to_string();
        self.run(move |m| m.register_user(&username)).await
    }

    pub async fn create_group(&self, creator: UserId, name: &str) -> ChatResult<Group> {
        let name = name.to_string();
        self.run(move |m| m.create_group(creator, &name)).await
    }

    pub async fn get_group(&self, group_id: GroupId) -> ChatResult<Group> {
        self.run(move |m| m.get_group(group_id)).await
    }

    pub async fn add_member(
        &self,
        requester: UserId,
        group_id: GroupId,
        target: UserId,
        as_admin: bool,
    ) -> ChatResult<Membership> {
        self.run(move |m| m.add_member(requester, group_id, target, as_admin))
            .await
    }

    pub async fn promote_admin(
        &self,
        requester: UserId,
        group_id: GroupId,
        target: UserId,
    ) -> ChatResult<Membership> {
        self.run(move |m| m.promote_admin(requester, group_id, target)).await
    }

    pub async fn group_stats(&self, group_id: GroupId) -> ChatResult<GroupStats> {
        self.run(move |m| m.group_stats(group_id)).await
    }

    pub async fn send_direct_message(
        &self,
        sender: UserId,
        receiver: UserId,
        content: &str,
    ) -> ChatResult<EditableMessage> {
        let content = content.to_string();
        self.run(move |m| m.send_direct_message(sender, receiver, &content))
            .await
    }

    pub async fn send_group_message(
        &self,
        sender: UserId,
        group_id: GroupId,
        content: &str,
    ) -> ChatResult<EditableMessage> {
        let content = content.to_string();
        self.run(move |m| m.send_group_message(sender, group_id, &content))
            .await
    }

    pub async fn get_message(&self, kind: MessageKind, id: MessageId) -> ChatResult<EditableMessage> {
        self.run(move |m| m.get_message(kind, id)).await
    }

    pub async fn edit_message(
        &self,
        kind: MessageKind,
        id: MessageId,
        requester: UserId,
        supplied: VersionStamp,
        content: &str,
    ) -> ChatResult<EditableMessage> {
        let content = content.to_string();
        self.run(move |m| m.edit_message(kind, id, requester, supplied, &content))
            .await
    }

    /// Summarize the latest messages of a group the requester belongs to.
    ///
    /// The transcript is read first and the connection released before the
    /// summarizer is awaited.
    pub async fn summarize_group(
        &self,
        requester: UserId,
        group_id: GroupId,
        summarizer: &dyn Summarizer,
    ) -> ChatResult<GroupSummary> {
        let request = self
            .run(move |m| m.summary_request(requester, group_id))
            .await?;
        let participants = request.participants();

        if request.is_empty() {
            debug!(group_id = %group_id, "nothing to summarize");
            return Ok(GroupSummary {
                group_id,
                participants,
                text: EMPTY_SUMMARY.to_string(),
            });
        }

        let text = summarizer.summarize(&request).await?;
        if text.trim().is_empty() {
            return Err(SummaryError::EmptyResponse.into());
        }

        info!(
            group_id = %group_id,
            messages = request.lines.len(),
            participants = participants.len(),
            "group summarized"
        );
        Ok(GroupSummary {
            group_id,
            participants,
            text,
        })
    }
}
