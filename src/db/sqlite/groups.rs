use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::{
    common::{WriteTx, bind_filter, scoped_where},
    memberships,
};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{GroupRepo, Page, PageParams},
    },
    models::{CreateGroup, Group, GroupDeletion, MembershipChange, MembershipRole, UpdateGroup},
    scim::SqlFilter,
};

const GROUP_COLUMNS: &str =
    "id, org_id, external_id, display_name, description, created_at, updated_at";

pub struct SqliteGroupRepo {
    pool: SqlitePool,
}

impl SqliteGroupRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_group(row: &sqlx::sqlite::SqliteRow) -> Group {
        Group {
            id: row.get("id"),
            org_id: row.get("org_id"),
            external_id: row.get("external_id"),
            display_name: row.get("display_name"),
            description: row.get("description"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl GroupRepo for SqliteGroupRepo {
    async fn create(&self, org_id: i64, input: CreateGroup) -> DbResult<Group> {
        let now = Utc::now();
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result = async {
            let conn = tx.conn()?;

            let id = sqlx::query(
                r#"
                INSERT INTO user_groups (org_id, external_id, display_name, description, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(org_id)
            .bind(&input.external_id)
            .bind(&input.display_name)
            .bind(&input.description)
            .bind(now)
            .bind(now)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();

            for &user_id in &input.member_ids {
                memberships::ensure_member(conn, org_id, id, user_id, MembershipRole::Member)
                    .await?;
            }

            Ok::<_, DbError>(id)
        }
        .await;

        let id = tx.finish(result).await?;

        Ok(Group {
            id,
            org_id,
            external_id: input.external_id,
            display_name: input.display_name,
            description: input.description,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, org_id: i64, id: i64) -> DbResult<Option<Group>> {
        let row = sqlx::query(&format!(
            "SELECT {GROUP_COLUMNS} FROM user_groups WHERE id = ? AND org_id = ?"
        ))
        .bind(id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::parse_group))
    }

    async fn list_filtered(
        &self,
        org_id: i64,
        filter: Option<&SqlFilter>,
        page: PageParams,
    ) -> DbResult<Page<Group>> {
        let where_clause = scoped_where("org_id", filter);

        let count_sql = format!("SELECT COUNT(*) AS cnt FROM user_groups WHERE {where_clause}");
        let total: i64 = bind_filter(sqlx::query(&count_sql).bind(org_id), filter)
            .fetch_one(&self.pool)
            .await?
            .get("cnt");

        let data_sql = format!(
            "SELECT {GROUP_COLUMNS} FROM user_groups WHERE {where_clause} ORDER BY id ASC LIMIT ? OFFSET ?"
        );
        let rows = bind_filter(sqlx::query(&data_sql).bind(org_id), filter)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: rows.iter().map(Self::parse_group).collect(),
            total,
        })
    }

    async fn update(
        &self,
        org_id: i64,
        id: i64,
        input: UpdateGroup,
        membership: &[MembershipChange],
    ) -> DbResult<Group> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result = async {
            let conn = tx.conn()?;

            let row = sqlx::query(&format!(
                "SELECT {GROUP_COLUMNS} FROM user_groups WHERE id = ? AND org_id = ?"
            ))
            .bind(id)
            .bind(org_id)
            .fetch_optional(&mut *conn)
            .await?;
            let current = row
                .as_ref()
                .map(Self::parse_group)
                .ok_or(DbError::NotFound)?;

            let updated = Group {
                display_name: input.display_name.unwrap_or(current.display_name),
                external_id: input.external_id.unwrap_or(current.external_id),
                description: input.description.unwrap_or(current.description),
                updated_at: Utc::now(),
                ..current
            };

            sqlx::query(
                r#"
                UPDATE user_groups
                SET display_name = ?, external_id = ?, description = ?, updated_at = ?
                WHERE id = ? AND org_id = ?
                "#,
            )
            .bind(&updated.display_name)
            .bind(&updated.external_id)
            .bind(&updated.description)
            .bind(updated.updated_at)
            .bind(id)
            .bind(org_id)
            .execute(&mut *conn)
            .await?;

            memberships::apply_changes(conn, org_id, id, membership).await?;

            Ok::<_, DbError>(updated)
        }
        .await;

        tx.finish(result).await
    }

    async fn delete(&self, org_id: i64, id: i64) -> DbResult<GroupDeletion> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result = async {
            let conn = tx.conn()?;

            if !memberships::group_in_org(conn, org_id, id).await? {
                return Err(DbError::NotFound);
            }

            let memberships = memberships::remove_all_members(conn, id).await?;

            let links = sqlx::query("DELETE FROM links WHERE group_id = ?")
                .bind(id)
                .execute(&mut *conn)
                .await?
                .rows_affected();

            sqlx::query("DELETE FROM user_groups WHERE id = ? AND org_id = ?")
                .bind(id)
                .bind(org_id)
                .execute(&mut *conn)
                .await?;

            Ok(GroupDeletion { memberships, links })
        }
        .await;

        tx.finish(result).await
    }
}
