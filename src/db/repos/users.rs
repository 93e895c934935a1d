use async_trait::async_trait;

use super::{Page, PageParams};
use crate::{
    db::error::DbResult,
    models::{CreateUser, UpdateUser, User, UserDeletion},
    scim::SqlFilter,
};

/// User storage. Every method is scoped to one organization; rows belonging
/// to other organizations behave as absent.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a user together with a personal group in which the user is the
    /// sole admin. Either all three rows are written or none are.
    ///
    /// Fails with `DbError::Conflict` if the email is already taken.
    async fn create_with_personal_group(&self, org_id: i64, input: CreateUser) -> DbResult<User>;

    async fn get(&self, org_id: i64, id: i64) -> DbResult<Option<User>>;

    /// List users ordered by id with an optional filter from `filter_to_sql()`.
    async fn list_filtered(
        &self,
        org_id: i64,
        filter: Option<&SqlFilter>,
        page: PageParams,
    ) -> DbResult<Page<User>>;

    /// Apply column changes and bump `updated_at` once.
    ///
    /// Fails with `DbError::NotFound` if the user does not exist in the
    /// organization and `DbError::Conflict` if a new email is already taken.
    async fn update(&self, org_id: i64, id: i64, input: UpdateUser) -> DbResult<User>;

    /// Hard-delete a user and every record that references it.
    async fn delete(&self, org_id: i64, id: i64) -> DbResult<UserDeletion>;
}
