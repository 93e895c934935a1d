use async_trait::async_trait;

use super::{Page, PageParams};
use crate::{
    db::error::DbResult,
    models::{CreateGroup, Group, GroupDeletion, MembershipChange, UpdateGroup},
    scim::SqlFilter,
};

/// Group storage, scoped to one organization per call.
#[async_trait]
pub trait GroupRepo: Send + Sync {
    /// Insert a group and its initial members in one transaction.
    async fn create(&self, org_id: i64, input: CreateGroup) -> DbResult<Group>;

    async fn get(&self, org_id: i64, id: i64) -> DbResult<Option<Group>>;

    /// List groups ordered by id with an optional filter from `filter_to_sql()`.
    async fn list_filtered(
        &self,
        org_id: i64,
        filter: Option<&SqlFilter>,
        page: PageParams,
    ) -> DbResult<Page<Group>>;

    /// Apply column changes and membership changes atomically, bumping
    /// `updated_at` once. Membership changes are applied in order.
    async fn update(
        &self,
        org_id: i64,
        id: i64,
        input: UpdateGroup,
        membership: &[MembershipChange],
    ) -> DbResult<Group>;

    /// Hard-delete a group, its memberships and the links shared with it.
    async fn delete(&self, org_id: i64, id: i64) -> DbResult<GroupDeletion>;
}
