//! Group membership reconciliation.
//!
//! The free functions operate on a borrowed connection so user and group
//! writes can run them inside their own transaction. `SqliteMembershipRepo`
//! only reads.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;

use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::{
    db::{error::DbResult, repos::MembershipRepo},
    models::{GroupMember, MembershipChange, MembershipRole},
};

/// Whether the group exists in the organization.
pub(super) async fn group_in_org(
    conn: &mut SqliteConnection,
    org_id: i64,
    group_id: i64,
) -> DbResult<bool> {
    let row = sqlx::query("SELECT 1 FROM user_groups WHERE id = ? AND org_id = ?")
        .bind(group_id)
        .bind(org_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// Insert the membership unless it already exists. The user must belong to
/// the organization; otherwise nothing is inserted.
pub(super) async fn ensure_member(
    conn: &mut SqliteConnection,
    org_id: i64,
    group_id: i64,
    user_id: i64,
    role: MembershipRole,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO group_memberships (user_id, group_id, role, created_at)
        SELECT id, ?, ?, ? FROM users WHERE id = ? AND org_id = ?
        "#,
    )
    .bind(group_id)
    .bind(role.as_str())
    .bind(Utc::now())
    .bind(user_id)
    .bind(org_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(super) async fn remove_member(
    conn: &mut SqliteConnection,
    group_id: i64,
    user_id: i64,
) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM group_memberships WHERE group_id = ? AND user_id = ?")
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(super) async fn remove_all_members(
    conn: &mut SqliteConnection,
    group_id: i64,
) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM group_memberships WHERE group_id = ?")
        .bind(group_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Make the member set exactly `user_ids`. Users who stay keep their role,
/// so a personal group's owner remains its admin. Callers must hold a
/// transaction so readers never see a partial set.
pub(super) async fn replace_members(
    conn: &mut SqliteConnection,
    org_id: i64,
    group_id: i64,
    user_ids: &[i64],
) -> DbResult<()> {
    let keep: HashSet<i64> = user_ids.iter().copied().collect();

    let current: Vec<i64> =
        sqlx::query_scalar("SELECT user_id FROM group_memberships WHERE group_id = ?")
            .bind(group_id)
            .fetch_all(&mut *conn)
            .await?;
    for user_id in current.into_iter().filter(|id| !keep.contains(id)) {
        remove_member(conn, group_id, user_id).await?;
    }

    for &user_id in user_ids {
        ensure_member(conn, org_id, group_id, user_id, MembershipRole::Member).await?;
    }
    Ok(())
}

/// Apply a membership plan in order.
pub(super) async fn apply_changes(
    conn: &mut SqliteConnection,
    org_id: i64,
    group_id: i64,
    changes: &[MembershipChange],
) -> DbResult<()> {
    for change in changes {
        match change {
            MembershipChange::Ensure(user_id) => {
                ensure_member(conn, org_id, group_id, *user_id, MembershipRole::Member).await?;
            }
            MembershipChange::Remove(user_id) => {
                remove_member(conn, group_id, *user_id).await?;
            }
            MembershipChange::RemoveAll => {
                remove_all_members(conn, group_id).await?;
            }
            MembershipChange::Replace(user_ids) => {
                replace_members(conn, org_id, group_id, user_ids).await?;
            }
        }
    }
    Ok(())
}

pub struct SqliteMembershipRepo {
    pool: SqlitePool,
}

impl SqliteMembershipRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepo for SqliteMembershipRepo {
    async fn list_members(&self, org_id: i64, group_id: i64) -> DbResult<Vec<GroupMember>> {
        let rows = sqlx::query(
            r#"
            SELECT m.user_id, m.role, u.email, u.display_name
            FROM group_memberships m
            JOIN users u ON u.id = m.user_id
            JOIN user_groups g ON g.id = m.group_id
            WHERE m.group_id = ? AND g.org_id = ?
            "#,
        )
        .bind(group_id)
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| GroupMember {
                user_id: row.get("user_id"),
                email: row.get("email"),
                display_name: row.get("display_name"),
                role: MembershipRole::parse(row.get::<&str, _>("role")).unwrap_or_default(),
            })
            .collect())
    }
}
