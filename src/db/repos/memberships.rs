use async_trait::async_trait;

use crate::{db::error::DbResult, models::GroupMember};

/// Read access to group memberships. Writes go through user and group
/// updates so they share the caller's transaction.
#[async_trait]
pub trait MembershipRepo: Send + Sync {
    /// Members of an organization's group with their identity. Empty for a
    /// group outside the organization.
    async fn list_members(&self, org_id: i64, group_id: i64) -> DbResult<Vec<GroupMember>>;
}
