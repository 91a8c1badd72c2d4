//! Message edit protocol
//!
//! Shared by direct and group messages. An edit is authorized when the
//! requester is the sender, the message is still inside the edit window,
//! and the caller's version stamp matches the stored one. Authorization
//! yields an [`EditDecision`] that the store commits as a single conditional
//! update:
//!
//! ```sql
//! UPDATE <messages> SET content = ?, version = version + 1
//!  WHERE id = ? AND version = <expected>
//! ```
//!
//! The stamp check here only rejects requests that are already stale when
//! read. Two editors holding the same fresh stamp both pass it; the
//! conditional update picks exactly one winner and the other observes
//! `StoreError::VersionConflict`, which [`EditDecision::conflict`] turns
//! into [`EditError::StaleVersion`].

use super::error::EditError;
use crate::model::{EditableMessage, Editability, MessageId, MessageKind, Timestamp, UserId, VersionStamp};
use crate::storage::StoreError;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_EDIT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// An authorized content update, valid only against `expected`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDecision {
    pub kind: MessageKind,
    pub message_id: MessageId,
    pub expected: VersionStamp,
}

impl EditDecision {
    /// Stamp the record carries once this decision commits
    pub fn new_version(&self) -> VersionStamp {
        self.expected.next()
    }

    /// Map a failed commit onto the edit taxonomy
    pub fn conflict(&self, err: StoreError) -> EditError {
        match err {
            StoreError::VersionConflict => EditError::StaleVersion { supplied: self.expected },
            other => EditError::Storage(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageEditProtocol {
    window: Duration,
}

impl Default for MessageEditProtocol {
    fn default() -> Self {
        Self::new(DEFAULT_EDIT_WINDOW)
    }
}

impl MessageEditProtocol {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether `requester` may replace the content of `message`.
    ///
    /// Checks run in order: authorship, edit window, version stamp.
    pub fn authorize_edit(
        &self,
        message: &EditableMessage,
        requester: UserId,
        supplied: VersionStamp,
        now: Timestamp,
    ) -> Result<EditDecision, EditError> {
        if message.sender_id != requester {
            return Err(EditError::Forbidden);
        }

        if message.editability(now, self.window) == Editability::Locked {
            return Err(EditError::EditWindowExpired { window: self.window });
        }

        if supplied != message.version {
            return Err(EditError::StaleVersion { supplied });
        }

        debug!(
            kind = %message.kind(),
            message_id = %message.id,
            version = %supplied,
            "edit authorized"
        );
        Ok(EditDecision {
            kind: message.kind(),
            message_id: message.id,
            expected: supplied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Conversation, GroupId};

    const MINUTE: u64 = 60_000;

    fn group_message() -> EditableMessage {
        EditableMessage {
            id: MessageId::new(10),
            conversation: Conversation::Group { group_id: GroupId::new(3) },
            sender_id: UserId::new(1),
            content: "A".to_string(),
            created_at: Timestamp::from_millis(1_000_000),
            version: VersionStamp::new(4),
        }
    }

    fn minutes_after(message: &EditableMessage, minutes: u64) -> Timestamp {
        Timestamp::from_millis(message.created_at.as_millis() + minutes * MINUTE)
    }

    #[test]
    fn test_author_within_window() {
        let protocol = MessageEditProtocol::default();
        let msg = group_message();

        let decision = protocol
            .authorize_edit(&msg, UserId::new(1), VersionStamp::new(4), minutes_after(&msg, 59))
            .unwrap();

        assert_eq!(decision.kind, MessageKind::Group);
        assert_eq!(decision.message_id, msg.id);
        assert_eq!(decision.new_version(), VersionStamp::new(5));
    }

    #[test]
    fn test_window_closed_after_an_hour() {
        let protocol = MessageEditProtocol::default();
        let msg = group_message();

        let result =
            protocol.authorize_edit(&msg, UserId::new(1), VersionStamp::new(4), minutes_after(&msg, 61));
        assert!(matches!(result, Err(EditError::EditWindowExpired { .. })));

        // Exactly one hour is still inside the window
        assert!(protocol
            .authorize_edit(&msg, UserId::new(1), VersionStamp::new(4), minutes_after(&msg, 60))
            .is_ok());
    }

    #[test]
    fn test_other_user_forbidden() {
        let protocol = MessageEditProtocol::default();
        let msg = group_message();

        let result =
            protocol.authorize_edit(&msg, UserId::new(2), VersionStamp::new(4), minutes_after(&msg, 1));
        assert!(matches!(result, Err(EditError::Forbidden)));
    }

    #[test]
    fn test_locked_message_rejects_everyone() {
        let protocol = MessageEditProtocol::default();
        let msg = group_message();
        let later = minutes_after(&msg, 24 * 60);

        for user in [1, 2, 3] {
            let result = protocol.authorize_edit(&msg, UserId::new(user), msg.version, later);
            assert!(result.is_err());
        }
        assert!(matches!(
            protocol.authorize_edit(&msg, UserId::new(1), msg.version, later),
            Err(EditError::EditWindowExpired { .. })
        ));
    }

    #[test]
    fn test_stale_stamp_rejected() {
        let protocol = MessageEditProtocol::default();
        let msg = group_message();

        let result =
            protocol.authorize_edit(&msg, UserId::new(1), VersionStamp::new(3), minutes_after(&msg, 5));
        assert!(matches!(
            result,
            Err(EditError::StaleVersion { supplied }) if supplied == VersionStamp::new(3)
        ));
    }

    #[test]
    fn test_commit_conflict_maps_to_stale_version() {
        let decision = EditDecision {
            kind: MessageKind::Direct,
            message_id: MessageId::new(1),
            expected: VersionStamp::new(2),
        };

        assert!(matches!(
            decision.conflict(StoreError::VersionConflict),
            EditError::StaleVersion { .. }
        ));
        assert!(matches!(decision.conflict(StoreError::Poisoned), EditError::Storage(_)));
    }
}
