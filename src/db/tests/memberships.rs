//! Membership reconciliation, driven through group updates.

use super::TestContext;
use crate::{
    db::{DbError, DbResult, PageParams},
    models::{Group, MembershipChange, MembershipRole, UpdateGroup},
};

async fn apply(
    ctx: &TestContext,
    org_id: i64,
    group_id: i64,
    changes: &[MembershipChange],
) -> DbResult<Group> {
    ctx.db
        .groups()
        .update(org_id, group_id, UpdateGroup::default(), changes)
        .await
}

pub async fn test_ensure_member_is_idempotent(ctx: &TestContext) {
    let org_id = ctx.create_org("Acme").await;
    let user = ctx.create_user(org_id, "twice@example.com").await;
    let group = ctx.create_group(org_id, "Team", vec![]).await;

    let ensure = MembershipChange::Ensure(user.id);
    apply(ctx, org_id, group.id, &[ensure.clone(), ensure.clone()])
        .await
        .unwrap();
    apply(ctx, org_id, group.id, &[ensure]).await.unwrap();

    assert_eq!(
        ctx.count_rows(
            "SELECT COUNT(*) FROM group_memberships WHERE group_id = ?",
            group.id
        )
        .await,
        1
    );
}

pub async fn test_remove_member(ctx: &TestContext) {
    let org_id = ctx.create_org("Acme").await;
    let u1 = ctx.create_user(org_id, "1@example.com").await;
    let u2 = ctx.create_user(org_id, "2@example.com").await;
    let u3 = ctx.create_user(org_id, "3@example.com").await;
    let group = ctx
        .create_group(org_id, "Team", vec![u1.id, u2.id, u3.id])
        .await;

    // Removing an absent member is a no-op
    let remove = MembershipChange::Remove(u2.id);
    apply(ctx, org_id, group.id, &[remove.clone(), remove])
        .await
        .unwrap();
    assert_eq!(ctx.member_ids(org_id, group.id).await, vec![u1.id, u3.id]);
}

pub async fn test_replace_members(ctx: &TestContext) {
    let org_id = ctx.create_org("Acme").await;
    let u1 = ctx.create_user(org_id, "1@example.com").await;
    let u2 = ctx.create_user(org_id, "2@example.com").await;
    let group = ctx.create_group(org_id, "Team", vec![u1.id]).await;

    apply(
        ctx,
        org_id,
        group.id,
        &[MembershipChange::Replace(vec![u2.id, u2.id])],
    )
    .await
    .unwrap();
    assert_eq!(ctx.member_ids(org_id, group.id).await, vec![u2.id]);

    apply(ctx, org_id, group.id, &[MembershipChange::Replace(vec![])])
        .await
        .unwrap();
    assert!(ctx.member_ids(org_id, group.id).await.is_empty());
}

pub async fn test_replace_keeps_owner_role(ctx: &TestContext) {
    let org_id = ctx.create_org("Acme").await;
    let owner = ctx.create_user(org_id, "owner@example.com").await;
    let guest = ctx.create_user(org_id, "guest@example.com").await;
    let personal = ctx
        .db
        .groups()
        .list_filtered(org_id, None, PageParams { offset: 0, limit: 1 })
        .await
        .unwrap()
        .items
        .remove(0);

    apply(
        ctx,
        org_id,
        personal.id,
        &[MembershipChange::Replace(vec![owner.id, guest.id])],
    )
    .await
    .unwrap();

    let members = ctx
        .db
        .memberships()
        .list_members(org_id, personal.id)
        .await
        .unwrap();
    let role_of = |user_id: i64| {
        members
            .iter()
            .find(|m| m.user_id == user_id)
            .map(|m| m.role)
    };
    assert_eq!(role_of(owner.id), Some(MembershipRole::Admin));
    assert_eq!(role_of(guest.id), Some(MembershipRole::Member));
}

pub async fn test_membership_is_org_scoped(ctx: &TestContext) {
    let org_a = ctx.create_org("A").await;
    let org_b = ctx.create_org("B").await;
    let alice = ctx.create_user(org_a, "alice@example.com").await;
    let mallory = ctx.create_user(org_b, "mallory@example.com").await;
    let group = ctx.create_group(org_a, "Team", vec![alice.id]).await;

    // A user from another organization is silently skipped
    apply(ctx, org_a, group.id, &[MembershipChange::Ensure(mallory.id)])
        .await
        .unwrap();
    assert_eq!(ctx.member_ids(org_a, group.id).await, vec![alice.id]);

    // A group from another organization does not exist
    let result = apply(ctx, org_b, group.id, &[MembershipChange::RemoveAll]).await;
    assert!(matches!(result, Err(DbError::NotFound)));
    assert_eq!(ctx.member_ids(org_a, group.id).await, vec![alice.id]);
    assert!(
        ctx.db
            .memberships()
            .list_members(org_b, group.id)
            .await
            .unwrap()
            .is_empty()
    );
}

pub async fn test_list_members_includes_identity(ctx: &TestContext) {
    let org_id = ctx.create_org("Acme").await;
    let user = ctx.create_user(org_id, "named@example.com").await;
    let group = ctx.create_group(org_id, "Team", vec![user.id]).await;

    let members = ctx
        .db
        .memberships()
        .list_members(org_id, group.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].email, "named@example.com");
    assert_eq!(members[0].role, MembershipRole::Member);
    assert_eq!(members[0].display(), "named@example.com");
}

mod sqlite_tests {
    use crate::db::tests::sqlite_test;

    sqlite_test!(test_ensure_member_is_idempotent);
    sqlite_test!(test_remove_member);
    sqlite_test!(test_replace_members);
    sqlite_test!(test_replace_keeps_owner_role);
    sqlite_test!(test_membership_is_org_scoped);
    sqlite_test!(test_list_members_includes_identity);
}
