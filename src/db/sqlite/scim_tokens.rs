//! SQLite implementation of the SCIM token repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::common::conflict_on_unique;
use crate::{
    db::{error::DbResult, repos::ScimTokenRepo},
    models::{CreateScimToken, ScimToken},
};

const TOKEN_COLUMNS: &str =
    "id, org_id, token_prefix, description, expires_at, last_used_at, created_at";

pub struct SqliteScimTokenRepo {
    pool: SqlitePool,
}

impl SqliteScimTokenRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_token(row: &sqlx::sqlite::SqliteRow) -> ScimToken {
        ScimToken {
            id: row.get("id"),
            org_id: row.get("org_id"),
            token_prefix: row.get("token_prefix"),
            description: row.get("description"),
            expires_at: row.get("expires_at"),
            last_used_at: row.get("last_used_at"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl ScimTokenRepo for SqliteScimTokenRepo {
    async fn create(
        &self,
        input: CreateScimToken,
        token_hash: &str,
        token_prefix: &str,
    ) -> DbResult<ScimToken> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO scim_tokens (org_id, token_hash, token_prefix, description, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(input.org_id)
        .bind(token_hash)
        .bind(token_prefix)
        .bind(&input.description)
        .bind(input.expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || "Token hash collision".into()))?;

        Ok(ScimToken {
            id: result.last_insert_rowid(),
            org_id: input.org_id,
            token_prefix: token_prefix.to_string(),
            description: input.description,
            expires_at: input.expires_at,
            last_used_at: None,
            created_at: now,
        })
    }

    async fn get_by_hash(&self, token_hash: &str) -> DbResult<Option<ScimToken>> {
        let row = sqlx::query(&format!(
            "SELECT {TOKEN_COLUMNS} FROM scim_tokens WHERE token_hash = ?"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::parse_token))
    }

    async fn list_by_org(&self, org_id: i64) -> DbResult<Vec<ScimToken>> {
        let rows = sqlx::query(&format!(
            "SELECT {TOKEN_COLUMNS} FROM scim_tokens WHERE org_id = ? ORDER BY id"
        ))
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::parse_token).collect())
    }

    async fn touch_last_used(&self, id: i64, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE scim_tokens SET last_used_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
