//! Group invariant guard
//!
//! Authorizes membership changes against the group's admin roster and
//! capacity limits. The guard never writes: it reads through a
//! [`MembershipRegistry`] and returns a [`MembershipDecision`] naming the one
//! row the registry should insert or update.
//!
//! The reads and the write are a check-then-act sequence. Callers must run
//! the guard and [`MembershipRegistry::apply`] inside one serializing store
//! transaction (see `ChatStore::group_transaction`), otherwise two
//! concurrent adds can both observe 24 members and both commit.

use super::error::{CapacityKind, MembershipError};
use super::registry::MembershipRegistry;
use crate::model::{GroupId, Membership, UserId};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_MAX_MEMBERS: u32 = 25;
pub const DEFAULT_MAX_ADMINS: u32 = 2;

/// Upper bounds on memberships per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLimits {
    /// Memberships per group, admins included
    pub max_members: u32,

    /// Memberships flagged admin per group
    pub max_admins: u32,
}

impl Default for GroupLimits {
    fn default() -> Self {
        Self {
            max_members: DEFAULT_MAX_MEMBERS,
            max_admins: DEFAULT_MAX_ADMINS,
        }
    }
}

/// The single row write an authorized membership change performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipDecision {
    Insert {
        group_id: GroupId,
        user_id: UserId,
        is_admin: bool,
    },
    Promote {
        membership: Membership,
    },
}

#[derive(Debug, Clone, Default)]
pub struct GroupInvariantGuard {
    limits: GroupLimits,
}

impl GroupInvariantGuard {
    pub fn new(limits: GroupLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> GroupLimits {
        self.limits
    }

    /// Admit a group's creator as its first admin.
    ///
    /// This is the only path that grants admin without an existing admin
    /// vouching for it.
    pub fn authorize_bootstrap<R>(
        &self,
        registry: &R,
        group_id: GroupId,
        creator: UserId,
    ) -> Result<MembershipDecision, MembershipError>
    where
        R: MembershipRegistry + ?Sized,
    {
        if registry.find(group_id, creator)?.is_some() {
            return Err(MembershipError::AlreadyMember);
        }
        self.check_member_capacity(registry, group_id)?;
        self.check_admin_capacity(registry, group_id)?;

        debug!(group_id = %group_id, user_id = %creator, "bootstrap admin authorized");
        Ok(MembershipDecision::Insert {
            group_id,
            user_id: creator,
            is_admin: true,
        })
    }

    /// Authorize `requester` adding `target` to the group, optionally as admin
    pub fn authorize_add_member<R>(
        &self,
        registry: &R,
        group_id: GroupId,
        requester: UserId,
        target: UserId,
        as_admin: bool,
    ) -> Result<MembershipDecision, MembershipError>
    where
        R: MembershipRegistry + ?Sized,
    {
        self.require_admin(registry, group_id, requester)?;

        if registry.find(group_id, target)?.is_some() {
            return Err(MembershipError::AlreadyMember);
        }
        self.check_member_capacity(registry, group_id)?;
        if as_admin {
            self.check_admin_capacity(registry, group_id)?;
        }

        debug!(
            group_id = %group_id,
            requester = %requester,
            target = %target,
            as_admin,
            "member add authorized"
        );
        Ok(MembershipDecision::Insert {
            group_id,
            user_id: target,
            is_admin: as_admin,
        })
    }

    /// Authorize `requester` promoting an existing member `target` to admin
    pub fn authorize_promote<R>(
        &self,
        registry: &R,
        group_id: GroupId,
        requester: UserId,
        target: UserId,
    ) -> Result<MembershipDecision, MembershipError>
    where
        R: MembershipRegistry + ?Sized,
    {
        self.require_admin(registry, group_id, requester)?;

        let membership = registry
            .find(group_id, target)?
            .ok_or(MembershipError::TargetNotMember)?;
        if membership.is_admin {
            return Err(MembershipError::AlreadyAdmin);
        }
        self.check_admin_capacity(registry, group_id)?;

        debug!(group_id = %group_id, requester = %requester, target = %target, "promotion authorized");
        Ok(MembershipDecision::Promote { membership })
    }

    fn require_admin<R>(
        &self,
        registry: &R,
        group_id: GroupId,
        requester: UserId,
    ) -> Result<(), MembershipError>
    where
        R: MembershipRegistry + ?Sized,
    {
        if registry.is_admin(group_id, requester)? {
            Ok(())
        } else {
            Err(MembershipError::NotAuthorized)
        }
    }

    fn check_member_capacity<R>(&self, registry: &R, group_id: GroupId) -> Result<(), MembershipError>
    where
        R: MembershipRegistry + ?Sized,
    {
        if registry.count(group_id)? >= self.limits.max_members {
            return Err(MembershipError::capacity(CapacityKind::Members, self.limits.max_members));
        }
        Ok(())
    }

    fn check_admin_capacity<R>(&self, registry: &R, group_id: GroupId) -> Result<(), MembershipError>
    where
        R: MembershipRegistry + ?Sized,
    {
        if registry.admin_count(group_id)? >= self.limits.max_admins {
            return Err(MembershipError::capacity(CapacityKind::Admins, self.limits.max_admins));
        }
        Ok(())
    }
}
