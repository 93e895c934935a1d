use std::sync::Arc;

use validator::Validate;

use crate::{
    db::{DbError, DbPool, DbResult},
    models::{CreateOrganization, Organization},
};

/// Service layer for organization operations
#[derive(Clone)]
pub struct OrganizationService {
    db: Arc<DbPool>,
}

impl OrganizationService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Create a new organization
    pub async fn create(&self, input: CreateOrganization) -> DbResult<Organization> {
        input
            .validate()
            .map_err(|e| DbError::Validation(e.to_string()))?;
        let org = self.db.organizations().create(input).await?;
        tracing::info!(org_id = org.id, name = %org.name, "Created organization");
        Ok(org)
    }

    /// Get organization by ID
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Organization>> {
        self.db.organizations().get_by_id(id).await
    }

    pub async fn list(&self) -> DbResult<Vec<Organization>> {
        self.db.organizations().list().await
    }
}
