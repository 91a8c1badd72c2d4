//! Racing requests against one store
//!
//! Each test releases its workers through a barrier so the guarded reads
//! overlap as much as the store allows.

use crate::manager::{ChatError, GroupManager, MessageManager};
use crate::membership::MembershipError;
use crate::messaging::EditError;
use crate::model::{MessageKind, VersionStamp};
use crate::storage::ChatStore;
use crate::test_utils::{memory_chat, sql_chat, TestChat};
use std::sync::{Arc, Barrier};
use std::thread;

fn race_for_last_seat<S: ChatStore + 'static>(chat: &TestChat<S>, racers: usize) {
    let (group, owner) = chat.seeded_group("crowded", 24);
    let (group_id, owner_id) = (group.id, owner.id);
    let candidates = chat.users(0..racers);
    let barrier = Arc::new(Barrier::new(racers));

    let handles: Vec<_> = candidates
        .into_iter()
        .map(|candidate| {
            let manager = Arc::clone(&chat.manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                manager.add_member(owner_id, group_id, candidate.id, false)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let admitted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 1, "exactly one request may take the last seat");

    for result in results.iter().filter(|r| r.is_err()) {
        assert!(
            matches!(
                result,
                Err(ChatError::Membership(MembershipError::CapacityExceeded { limit: 25, .. }))
            ),
            "unexpected outcome: {:?}",
            result
        );
    }

    let stats = chat.manager.group_stats(group.id).unwrap();
    assert_eq!(stats.members, 25);
}

fn race_for_second_admin<S: ChatStore + 'static>(chat: &TestChat<S>) {
    let (group, owner) = chat.seeded_group("council", 6);
    let members: Vec<_> = (1..6)
        .map(|i| {
            chat.manager
                .store()
                .find_user_by_username(&format!("council-member-{}", i))
                .unwrap()
                .unwrap()
        })
        .collect();
    let (group_id, owner_id) = (group.id, owner.id);
    let barrier = Arc::new(Barrier::new(members.len()));

    let handles: Vec<_> = members
        .into_iter()
        .map(|member| {
            let manager = Arc::clone(&chat.manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                manager.promote_admin(owner_id, group_id, member.id)
            })
        })
        .collect();

    let promoted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(promoted, 1);

    let stats = chat.manager.group_stats(group.id).unwrap();
    assert_eq!((stats.members, stats.admins), (6, 2));
}

fn race_for_edit<S: ChatStore + 'static>(chat: &TestChat<S>) {
    let users = chat.users(0..2);
    let (alice, bob) = (users[0].id, users[1].id);
    let original = chat.manager.send_direct_message(alice, bob, "A").unwrap();
    let (message_id, stamp) = (original.id, original.version);
    let barrier = Arc::new(Barrier::new(2));

    // Two sessions of the same author, both holding the original stamp
    let handles: Vec<_> = ["from laptop", "from phone"]
        .into_iter()
        .map(|content| {
            let manager = Arc::clone(&chat.manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let result =
                    manager.edit_message(MessageKind::Direct, message_id, alice, stamp, content);
                (content, result)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = outcomes.iter().filter(|(_, r)| r.is_ok()).collect();
    assert_eq!(winners.len(), 1);

    let loser = outcomes.iter().find(|(_, r)| r.is_err()).unwrap();
    assert!(matches!(
        loser.1,
        Err(ChatError::Edit(EditError::StaleVersion { .. }))
    ));

    let stored = chat.manager.get_message(MessageKind::Direct, original.id).unwrap();
    assert_eq!(stored.content, winners[0].0);
    assert_eq!(stored.version, VersionStamp::new(2));
    assert_ne!(stored.version, original.version);
}

#[test]
fn test_last_seat_memory() {
    race_for_last_seat(&memory_chat(), 8);
}

#[test]
fn test_last_seat_sqlite() {
    let (chat, _dir) = sql_chat();
    race_for_last_seat(&chat, 8);
}

#[test]
fn test_two_requests_for_25th_member() {
    let (chat, _dir) = sql_chat();
    race_for_last_seat(&chat, 2);
}

#[test]
fn test_second_admin_memory() {
    race_for_second_admin(&memory_chat());
}

#[test]
fn test_second_admin_sqlite() {
    let (chat, _dir) = sql_chat();
    race_for_second_admin(&chat);
}

#[test]
fn test_concurrent_edits_memory() {
    race_for_edit(&memory_chat());
}

#[test]
fn test_concurrent_edits_sqlite() {
    let (chat, _dir) = sql_chat();
    race_for_edit(&chat);
}
