//! Parley core
//!
//! Group membership and message editing for a chat backend:
//!
//! - [`membership`]: the member/admin capacity guard and the registry it
//!   writes through
//! - [`messaging`]: the optimistic edit protocol for direct and group messages
//! - [`storage`]: SQLite and in-memory stores with serializing transactions
//! - [`manager_impl`] and [`async_manager`]: the operations the request
//!   layer calls

pub mod async_manager;
pub mod clock;
pub mod config;
pub mod identity;
pub mod logging;
pub mod manager;
pub mod manager_impl;
pub mod membership;
pub mod messaging;
pub mod model;
pub mod outcome;
pub mod storage;
pub mod summary;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod tests;

pub use async_manager::AsyncChatManager;
pub use config::Config;
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel};
pub use manager::{ChatError, ChatResult, GroupManager, MessageManager};
pub use manager_impl::ChatManagerImpl;
pub use outcome::OutcomeCategory;
pub use storage::{ChatSqlStore, ChatStore, MemoryChatStore};
