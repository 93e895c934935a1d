use async_trait::async_trait;

use crate::{
    db::error::DbResult,
    models::{CreateOrganization, Organization},
};

#[async_trait]
pub trait OrganizationRepo: Send + Sync {
    async fn create(&self, input: CreateOrganization) -> DbResult<Organization>;
    async fn get_by_id(&self, id: i64) -> DbResult<Option<Organization>>;
    async fn list(&self) -> DbResult<Vec<Organization>>;
}
