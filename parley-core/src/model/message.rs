//! Direct and group messages

use super::types::{GroupId, MessageId, Timestamp, UserId, VersionStamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which message table a [`MessageId`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Direct,
    Group,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Direct => "direct",
            MessageKind::Group => "group",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" | "dm" => Ok(MessageKind::Direct),
            "group" => Ok(MessageKind::Group),
            other => Err(format!("unknown message kind: {}", other)),
        }
    }
}

/// Where a message was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conversation {
    Direct { receiver_id: UserId },
    Group { group_id: GroupId },
}

impl Conversation {
    pub fn kind(&self) -> MessageKind {
        match self {
            Conversation::Direct { .. } => MessageKind::Direct,
            Conversation::Group { .. } => MessageKind::Group,
        }
    }
}

/// Whether a message can still be edited by its author
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Editability {
    /// Within the edit window
    Fresh,
    /// Past the edit window. Never returns to `Fresh`.
    Locked,
}

/// A stored message whose content its sender may edit for a limited time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableMessage {
    pub id: MessageId,
    pub conversation: Conversation,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: Timestamp,

    /// Current optimistic-concurrency token
    pub version: VersionStamp,
}

impl EditableMessage {
    pub fn kind(&self) -> MessageKind {
        self.conversation.kind()
    }

    pub fn age(&self, now: Timestamp) -> Duration {
        now.saturating_since(self.created_at)
    }

    /// An age of exactly `window` is still `Fresh`
    pub fn editability(&self, now: Timestamp, window: Duration) -> Editability {
        if self.age(now) > window {
            Editability::Locked
        } else {
            Editability::Fresh
        }
    }
}

/// A message that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation: Conversation,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: Timestamp,
}
