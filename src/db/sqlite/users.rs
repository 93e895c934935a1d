use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::{
    common::{WriteTx, bind_filter, conflict_on_unique, scoped_where},
    memberships,
};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{Page, PageParams, UserRepo},
    },
    models::{CreateUser, MembershipRole, UpdateUser, User, UserDeletion},
    scim::SqlFilter,
};

const USER_COLUMNS: &str = "id, org_id, external_id, email, display_name, given_name, family_name, active, created_at, updated_at";

const PERSONAL_GROUP_DESCRIPTION: &str = "Personal group";

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_user(row: &sqlx::sqlite::SqliteRow) -> User {
        User {
            id: row.get("id"),
            org_id: row.get("org_id"),
            external_id: row.get("external_id"),
            email: row.get("email"),
            display_name: row.get("display_name"),
            given_name: row.get("given_name"),
            family_name: row.get("family_name"),
            active: row.get::<i32, _>("active") != 0,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

fn email_taken(email: &str) -> String {
    format!("User with userName '{}' already exists", email)
}

#[async_trait]
impl UserRepo for SqliteUserRepo {
    async fn create_with_personal_group(&self, org_id: i64, input: CreateUser) -> DbResult<User> {
        let now = Utc::now();
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result = async {
            let conn = tx.conn()?;

            let user_id = sqlx::query(
                r#"
                INSERT INTO users (
                    org_id, external_id, email, display_name, given_name, family_name,
                    active, created_at, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(org_id)
            .bind(&input.external_id)
            .bind(&input.email)
            .bind(&input.display_name)
            .bind(&input.given_name)
            .bind(&input.family_name)
            .bind(input.active as i32)
            .bind(now)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| conflict_on_unique(e, || email_taken(&input.email)))?
            .last_insert_rowid();

            let group_name = input.display_name.as_deref().unwrap_or(&input.email);
            let group_id = sqlx::query(
                r#"
                INSERT INTO user_groups (org_id, display_name, description, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(org_id)
            .bind(group_name)
            .bind(PERSONAL_GROUP_DESCRIPTION)
            .bind(now)
            .bind(now)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();

            let inserted =
                memberships::ensure_member(conn, org_id, group_id, user_id, MembershipRole::Admin)
                    .await?;
            if !inserted {
                return Err(DbError::Internal(format!(
                    "personal group membership for user {user_id} was not created"
                )));
            }

            Ok(user_id)
        }
        .await;

        let user_id = tx.finish(result).await?;

        Ok(User {
            id: user_id,
            org_id,
            external_id: input.external_id,
            email: input.email,
            display_name: input.display_name,
            given_name: input.given_name,
            family_name: input.family_name,
            active: input.active,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, org_id: i64, id: i64) -> DbResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ? AND org_id = ?"
        ))
        .bind(id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::parse_user))
    }

    async fn list_filtered(
        &self,
        org_id: i64,
        filter: Option<&SqlFilter>,
        page: PageParams,
    ) -> DbResult<Page<User>> {
        let where_clause = scoped_where("org_id", filter);

        let count_sql = format!("SELECT COUNT(*) AS cnt FROM users WHERE {where_clause}");
        let count_query = bind_filter(sqlx::query(&count_sql).bind(org_id), filter);
        let total: i64 = count_query.fetch_one(&self.pool).await?.get("cnt");

        let data_sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {where_clause} ORDER BY id ASC LIMIT ? OFFSET ?"
        );
        let rows = bind_filter(sqlx::query(&data_sql).bind(org_id), filter)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: rows.iter().map(Self::parse_user).collect(),
            total,
        })
    }

    async fn update(&self, org_id: i64, id: i64, input: UpdateUser) -> DbResult<User> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result = async {
            let conn = tx.conn()?;

            let row = sqlx::query(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id = ? AND org_id = ?"
            ))
            .bind(id)
            .bind(org_id)
            .fetch_optional(&mut *conn)
            .await?;
            let current = row.as_ref().map(Self::parse_user).ok_or(DbError::NotFound)?;

            let updated = User {
                email: input.email.unwrap_or(current.email),
                display_name: input.display_name.unwrap_or(current.display_name),
                external_id: input.external_id.unwrap_or(current.external_id),
                given_name: input.given_name.unwrap_or(current.given_name),
                family_name: input.family_name.unwrap_or(current.family_name),
                active: input.active.unwrap_or(current.active),
                updated_at: Utc::now(),
                ..current
            };

            sqlx::query(
                r#"
                UPDATE users
                SET email = ?, display_name = ?, external_id = ?, given_name = ?,
                    family_name = ?, active = ?, updated_at = ?
                WHERE id = ? AND org_id = ?
                "#,
            )
            .bind(&updated.email)
            .bind(&updated.display_name)
            .bind(&updated.external_id)
            .bind(&updated.given_name)
            .bind(&updated.family_name)
            .bind(updated.active as i32)
            .bind(updated.updated_at)
            .bind(id)
            .bind(org_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| conflict_on_unique(e, || email_taken(&updated.email)))?;

            Ok::<_, DbError>(updated)
        }
        .await;

        tx.finish(result).await
    }

    async fn delete(&self, org_id: i64, id: i64) -> DbResult<UserDeletion> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result = async {
            let conn = tx.conn()?;

            let exists = sqlx::query("SELECT 1 FROM users WHERE id = ? AND org_id = ?")
                .bind(id)
                .bind(org_id)
                .fetch_optional(&mut *conn)
                .await?;
            if exists.is_none() {
                return Err(DbError::NotFound);
            }

            let api_keys = sqlx::query("DELETE FROM api_keys WHERE user_id = ?")
                .bind(id)
                .execute(&mut *conn)
                .await?
                .rows_affected();

            let memberships = sqlx::query("DELETE FROM group_memberships WHERE user_id = ?")
                .bind(id)
                .execute(&mut *conn)
                .await?
                .rows_affected();

            let sso_identities = sqlx::query("DELETE FROM sso_identities WHERE user_id = ?")
                .bind(id)
                .execute(&mut *conn)
                .await?
                .rows_affected();

            let links = sqlx::query("DELETE FROM links WHERE author_id = ?")
                .bind(id)
                .execute(&mut *conn)
                .await?
                .rows_affected();

            sqlx::query("DELETE FROM users WHERE id = ? AND org_id = ?")
                .bind(id)
                .bind(org_id)
                .execute(&mut *conn)
                .await?;

            Ok(UserDeletion {
                api_keys,
                memberships,
                sso_identities,
                links,
            })
        }
        .await;

        tx.finish(result).await
    }
}
