//! Repository tests against in-memory SQLite.
//!
//! Each module holds shared test functions taking a [`TestContext`] and a
//! `sqlite_test!` macro that wires them to a freshly migrated database.

mod memberships;
mod organizations;

use crate::{
    db::DbPool,
    models::{CreateGroup, CreateOrganization, CreateUser, Group, User},
};

pub struct TestContext {
    pub db: DbPool,
}

impl TestContext {
    pub async fn new() -> Self {
        Self {
            db: harness::create_test_db().await,
        }
    }

    /// Create a test organization and return its ID
    pub async fn create_org(&self, name: &str) -> i64 {
        self.db
            .organizations()
            .create(CreateOrganization {
                name: name.to_string(),
            })
            .await
            .expect("Failed to create test org")
            .id
    }

    pub async fn create_user(&self, org_id: i64, email: &str) -> User {
        self.db
            .users()
            .create_with_personal_group(org_id, create_user_input(email))
            .await
            .expect("Failed to create test user")
    }

    pub async fn create_group(&self, org_id: i64, name: &str, member_ids: Vec<i64>) -> Group {
        self.db
            .groups()
            .create(
                org_id,
                CreateGroup {
                    external_id: None,
                    display_name: name.to_string(),
                    description: None,
                    member_ids,
                },
            )
            .await
            .expect("Failed to create test group")
    }

    /// Sorted member user ids of a group.
    pub async fn member_ids(&self, org_id: i64, group_id: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .db
            .memberships()
            .list_members(org_id, group_id)
            .await
            .expect("Failed to list members")
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub async fn count_rows(&self, sql: &str, id: i64) -> i64 {
        sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(self.db.pool())
            .await
            .expect("Failed to count rows")
    }
}

pub fn create_user_input(email: &str) -> CreateUser {
    CreateUser {
        external_id: None,
        email: email.to_string(),
        display_name: None,
        given_name: None,
        family_name: None,
        active: true,
    }
}

/// Generates a `#[tokio::test]` that runs the shared test function of the
/// same name against a fresh database.
macro_rules! sqlite_test {
    ($name:ident) => {
        #[tokio::test]
        async fn $name() {
            let ctx = $crate::db::tests::TestContext::new().await;
            super::$name(&ctx).await;
        }
    };
}

pub(crate) use sqlite_test;
