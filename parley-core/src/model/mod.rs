//! Data model shared by the membership and messaging layers

pub mod group;
pub mod message;
pub mod types;

pub use group::{Group, GroupStats, Membership, User, MAX_GROUP_NAME_LEN};
pub use message::{Conversation, EditableMessage, Editability, MessageKind, NewMessage};
pub use types::{GroupId, MembershipId, MessageId, Timestamp, UserId, VersionStamp};
