//! Membership registry
//!
//! The registry is the only writer of membership rows. It exposes the reads
//! the invariant guard needs (lookup and counts) and the two writes a guard
//! decision can direct (insert a row, raise the admin flag). Uniqueness of
//! (group, user) is enforced by the backing storage, so a duplicate insert
//! fails even if a caller skipped the guard.

use super::guard::MembershipDecision;
use crate::model::{GroupId, Membership, MembershipId, Timestamp, UserId};
use crate::storage::StoreResult;

pub trait MembershipRegistry {
    /// Look up the membership for a (group, user) pair
    fn find(&self, group_id: GroupId, user_id: UserId) -> StoreResult<Option<Membership>>;

    /// Number of memberships in a group, admins included
    fn count(&self, group_id: GroupId) -> StoreResult<u32>;

    /// Number of memberships flagged admin in a group
    fn admin_count(&self, group_id: GroupId) -> StoreResult<u32>;

    /// Insert a membership row. Fails with `StoreError::Duplicate` if the pair exists.
    fn insert(
        &mut self,
        group_id: GroupId,
        user_id: UserId,
        is_admin: bool,
        joined_at: Timestamp,
    ) -> StoreResult<Membership>;

    /// Raise the admin flag on an existing row
    fn set_admin(&mut self, membership_id: MembershipId) -> StoreResult<()>;

    fn is_admin(&self, group_id: GroupId, user_id: UserId) -> StoreResult<bool> {
        Ok(self.find(group_id, user_id)?.map(|m| m.is_admin).unwrap_or(false))
    }

    /// Commit the single row write a guard decision directs
    fn apply(&mut self, decision: &MembershipDecision, now: Timestamp) -> StoreResult<Membership> {
        match *decision {
            MembershipDecision::Insert { group_id, user_id, is_admin } => {
                self.insert(group_id, user_id, is_admin, now)
            }
            MembershipDecision::Promote { ref membership } => {
                self.set_admin(membership.id)?;
                Ok(Membership { is_admin: true, ..membership.clone() })
            }
        }
    }
}
