use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::{
    db::{error::DbResult, repos::OrganizationRepo},
    models::{CreateOrganization, Organization},
};

pub struct SqliteOrganizationRepo {
    pool: SqlitePool,
}

impl SqliteOrganizationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_org(row: &sqlx::sqlite::SqliteRow) -> Organization {
        Organization {
            id: row.get("id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl OrganizationRepo for SqliteOrganizationRepo {
    async fn create(&self, input: CreateOrganization) -> DbResult<Organization> {
        let now = chrono::Utc::now();

        let result = sqlx::query("INSERT INTO organizations (name, created_at) VALUES (?, ?)")
            .bind(&input.name)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(Organization {
            id: result.last_insert_rowid(),
            name: input.name,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> DbResult<Option<Organization>> {
        let row = sqlx::query("SELECT id, name, created_at FROM organizations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::parse_org))
    }

    async fn list(&self) -> DbResult<Vec<Organization>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM organizations ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Self::parse_org).collect())
    }
}
