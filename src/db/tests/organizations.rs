//! Shared tests for OrganizationRepo implementations

use super::TestContext;
use crate::models::CreateOrganization;

pub async fn test_create_and_get_organization(ctx: &TestContext) {
    let repo = ctx.db.organizations();
    let org = repo
        .create(CreateOrganization {
            name: "Acme".to_string(),
        })
        .await
        .expect("Failed to create organization");

    assert_eq!(org.name, "Acme");

    let fetched = repo
        .get_by_id(org.id)
        .await
        .expect("Failed to get organization")
        .expect("Organization should exist");
    assert_eq!(fetched.id, org.id);
    assert_eq!(fetched.name, "Acme");

    assert!(repo.get_by_id(org.id + 100).await.unwrap().is_none());
}

pub async fn test_list_organizations(ctx: &TestContext) {
    let first = ctx.create_org("First").await;
    let second = ctx.create_org("Second").await;

    let orgs = ctx.db.organizations().list().await.unwrap();
    let ids: Vec<i64> = orgs.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![first, second]);
}

mod sqlite_tests {
    use crate::db::tests::sqlite_test;

    sqlite_test!(test_create_and_get_organization);
    sqlite_test!(test_list_organizations);
}
