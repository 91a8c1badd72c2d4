//! Editable direct and group messages

pub mod edit;
pub mod error;

pub use edit::{EditDecision, MessageEditProtocol, DEFAULT_EDIT_WINDOW};
pub use error::EditError;
