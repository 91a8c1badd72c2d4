/*
    End-to-end test over the public API

    Exercises a file-backed store through the blocking manager:
    - group creation with the creator bootstrapped as admin
    - membership changes persisted across store instances
    - the edit protocol against a reopened database
*/

use parley_core::config::{LimitsConfig, StoreConfig};
use parley_core::model::MessageKind;
use parley_core::{ChatError, ChatManagerImpl, ChatSqlStore, GroupManager, MessageManager};
use std::sync::Arc;
use tempfile::tempdir;

fn open(config: &StoreConfig) -> ChatManagerImpl<ChatSqlStore> {
    let store = ChatSqlStore::open(config).expect("open store");
    ChatManagerImpl::new(Arc::new(store), &LimitsConfig::default())
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let config = StoreConfig {
        database_path: dir.path().join("parley.db"),
        ..StoreConfig::default()
    };

    let (group_id, alice_id, message_id, stamp) = {
        let chat = open(&config);
        let alice = chat.register_user("alice").unwrap();
        let bob = chat.register_user("bob").unwrap();
        let group = chat.create_group(alice.id, "ops").unwrap();
        chat.add_member(alice.id, group.id, bob.id, false).unwrap();
        chat.promote_admin(alice.id, group.id, bob.id).unwrap();

        let message = chat.send_group_message(bob.id, group.id, "deploy at 5").unwrap();
        (group.id, alice.id, message.id, message.version)
    };

    let chat = open(&config);
    let stats = chat.group_stats(group_id).unwrap();
    assert_eq!((stats.members, stats.admins), (2, 2));

    let message = chat.get_message(MessageKind::Group, message_id).unwrap();
    assert_eq!(message.version, stamp);

    // alice did not send it
    let result = chat.edit_message(MessageKind::Group, message_id, alice_id, stamp, "deploy at 6");
    assert!(matches!(result, Err(ChatError::Edit(_))));
    assert_eq!(result.unwrap_err().category().status_code(), 403);

    let carol = chat.register_user("carol").unwrap();
    let result = chat.promote_admin(alice_id, group_id, carol.id);
    assert_eq!(result.unwrap_err().category().status_code(), 400);
}
