//! Group membership control
//!
//! - [`MembershipRegistry`]: owns membership rows and their admin flag
//! - [`GroupInvariantGuard`]: authorizes adds and promotions against the
//!   admin roster and the member/admin capacity limits

pub mod error;
pub mod guard;
pub mod registry;

pub use error::{CapacityKind, MembershipError};
pub use guard::{
    GroupInvariantGuard, GroupLimits, MembershipDecision, DEFAULT_MAX_ADMINS, DEFAULT_MAX_MEMBERS,
};
pub use registry::MembershipRegistry;
