//! Fixtures for seeding stores and managers

use crate::clock::ManualClock;
use crate::config::{LimitsConfig, StoreConfig};
use crate::manager::GroupManager;
use crate::manager_impl::ChatManagerImpl;
use crate::model::{Group, Timestamp, User};
use crate::storage::{ChatSqlStore, ChatStore, MemoryChatStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Start time for manual clocks, well clear of zero
pub const T0: Timestamp = Timestamp(1_700_000_000_000);

/// A manager whose clock only moves when the test moves it
pub struct TestChat<S> {
    pub manager: Arc<ChatManagerImpl<S>>,
    pub clock: Arc<ManualClock>,
}

impl<S: ChatStore> TestChat<S> {
    pub fn with_store(store: S) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let manager =
            ChatManagerImpl::with_clock(Arc::new(store), &LimitsConfig::default(), clock.clone());
        Self {
            manager: Arc::new(manager),
            clock,
        }
    }

    /// Register `user-<i>` for each i in `range`
    pub fn users(&self, range: std::ops::Range<usize>) -> Vec<User> {
        range
            .map(|i| self.manager.register_user(&format!("user-{}", i)).unwrap())
            .collect()
    }

    /// Create a group owned by a fresh admin and fill it to `size` members.
    ///
    /// Returns the group and its creator.
    pub fn seeded_group(&self, name: &str, size: usize) -> (Group, User) {
        let owner = self.manager.register_user(&format!("{}-owner", name)).unwrap();
        let group = self.manager.create_group(owner.id, name).unwrap();

        for i in 1..size {
            let member = self
                .manager
                .register_user(&format!("{}-member-{}", name, i))
                .unwrap();
            self.manager.add_member(owner.id, group.id, member.id, false).unwrap();
        }

        (group, owner)
    }
}

pub fn memory_chat() -> TestChat<MemoryChatStore> {
    TestChat::with_store(MemoryChatStore::new())
}

/// A file-backed store with a multi-connection pool. Keep the `TempDir`
/// alive for the duration of the test.
pub fn sql_chat() -> (TestChat<ChatSqlStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        database_path: dir.path().join("parley.db"),
        pool_size: 8,
        ..StoreConfig::default()
    };
    let store = ChatSqlStore::open(&config).unwrap();
    (TestChat::with_store(store), dir)
}
