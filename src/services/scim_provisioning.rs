//! SCIM 2.0 User and Group Provisioning Service
//!
//! Orchestrates provisioning requests from identity providers: request
//! mapping, validation, filter translation, PATCH planning and the
//! repository calls that persist the result. Every operation takes the
//! authenticated organization explicitly and never sees resources outside it.

use std::sync::Arc;

use validator::Validate;

use crate::{
    config::ScimConfig,
    db::{DbError, DbPool, PageParams},
    models::Group,
    scim::{
        GroupPatch, MappingError, PatchError, PatchRequest, ScimErrorResponse, ScimGroup,
        ScimGroupRequest, ScimListParams, ScimListResponse, ScimResourceType, ScimUser,
        ScimUserRequest, SqlFilter, filter_to_sql, mapper, parse_filter, plan_group_patch,
        plan_user_patch,
    },
};

/// SCIM provisioning error types
#[derive(Debug, thiserror::Error)]
pub enum ScimProvisioningError {
    /// Request failed validation before anything was written
    #[error("{0}")]
    Validation(String),

    /// A uniqueness constraint rejected the write
    #[error("{0}")]
    Conflict(String),

    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error(transparent)]
    Database(DbError),
}

impl From<DbError> for ScimProvisioningError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Conflict(msg) => ScimProvisioningError::Conflict(msg),
            DbError::Validation(msg) => ScimProvisioningError::Validation(msg),
            other => ScimProvisioningError::Database(other),
        }
    }
}

impl From<PatchError> for ScimProvisioningError {
    fn from(e: PatchError) -> Self {
        ScimProvisioningError::Validation(e.to_string())
    }
}

impl From<MappingError> for ScimProvisioningError {
    fn from(e: MappingError) -> Self {
        ScimProvisioningError::Validation(e.to_string())
    }
}

impl From<validator::ValidationErrors> for ScimProvisioningError {
    fn from(e: validator::ValidationErrors) -> Self {
        ScimProvisioningError::Validation(e.to_string())
    }
}

impl From<ScimProvisioningError> for ScimErrorResponse {
    fn from(e: ScimProvisioningError) -> Self {
        match e {
            ScimProvisioningError::Validation(msg) => ScimErrorResponse::invalid_value(msg),
            ScimProvisioningError::Conflict(msg) => ScimErrorResponse::uniqueness(msg),
            e @ ScimProvisioningError::NotFound { .. } => {
                ScimErrorResponse::not_found(e.to_string())
            }
            ScimProvisioningError::Database(db_err) => {
                tracing::error!(error = %db_err, "SCIM provisioning failed");
                ScimErrorResponse::internal("Internal server error")
            }
        }
    }
}

/// Result type for SCIM provisioning operations
pub type ProvisioningResult<T> = Result<T, ScimProvisioningError>;

/// Resource ids are decimal strings; anything else names no resource.
fn parse_id(resource: &'static str, raw: &str) -> ProvisioningResult<i64> {
    raw.parse().map_err(|_| ScimProvisioningError::NotFound {
        resource,
        id: raw.to_string(),
    })
}

fn not_found(resource: &'static str, id: i64) -> ScimProvisioningError {
    ScimProvisioningError::NotFound {
        resource,
        id: id.to_string(),
    }
}

/// Turn a repository `NotFound` into a resource-specific one.
fn not_found_as(resource: &'static str, id: i64) -> impl FnOnce(DbError) -> ScimProvisioningError {
    move |e| match e {
        DbError::NotFound => not_found(resource, id),
        other => other.into(),
    }
}

/// Resolve `?filter=` to SQL. Unsupported filters match everything.
fn list_filter(raw: Option<&str>, resource_type: ScimResourceType) -> Option<SqlFilter> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let sql = parse_filter(raw).and_then(|f| filter_to_sql(&f, resource_type));
    if sql.is_none() {
        tracing::debug!(filter = raw, "Unsupported SCIM filter, returning full collection");
    }
    sql
}

/// SCIM User and Group provisioning service.
#[derive(Clone)]
pub struct ScimProvisioningService {
    db: Arc<DbPool>,
    base_url: Arc<str>,
    max_members: usize,
    default_page_size: i64,
    max_page_size: i64,
}

impl ScimProvisioningService {
    pub fn new(db: Arc<DbPool>, base_url: impl Into<String>, config: &ScimConfig) -> Self {
        Self {
            db,
            base_url: Arc::from(base_url.into()),
            max_members: config.max_members_per_request,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn page(&self, params: &ScimListParams) -> (i64, PageParams) {
        let (start_index, count) = params.resolve(self.default_page_size, self.max_page_size);
        (
            start_index,
            PageParams {
                offset: start_index - 1,
                limit: count,
            },
        )
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn list_users(
        &self,
        org_id: i64,
        params: &ScimListParams,
    ) -> ProvisioningResult<ScimListResponse<ScimUser>> {
        let filter = list_filter(params.filter.as_deref(), ScimResourceType::User);
        let (start_index, page) = self.page(params);

        let result = self
            .db
            .users()
            .list_filtered(org_id, filter.as_ref(), page)
            .await?;

        let resources = result
            .items
            .iter()
            .map(|u| mapper::user_to_resource(u, &self.base_url))
            .collect();
        Ok(ScimListResponse::new(resources, result.total, start_index))
    }

    pub async fn get_user(&self, org_id: i64, id: &str) -> ProvisioningResult<ScimUser> {
        let user_id = parse_id("User", id)?;
        let user = self
            .db
            .users()
            .get(org_id, user_id)
            .await?
            .ok_or_else(|| not_found("User", user_id))?;
        Ok(mapper::user_to_resource(&user, &self.base_url))
    }

    /// Create a user together with their personal group.
    pub async fn create_user(
        &self,
        org_id: i64,
        request: ScimUserRequest,
    ) -> ProvisioningResult<ScimUser> {
        let input = mapper::create_user_from_request(request)?;
        input.validate()?;

        let user = self
            .db
            .users()
            .create_with_personal_group(org_id, input)
            .await?;

        tracing::info!(org_id, user_id = user.id, "Provisioned SCIM user");
        Ok(mapper::user_to_resource(&user, &self.base_url))
    }

    pub async fn replace_user(
        &self,
        org_id: i64,
        id: &str,
        request: ScimUserRequest,
    ) -> ProvisioningResult<ScimUser> {
        let user_id = parse_id("User", id)?;
        let update = mapper::replace_user_from_request(request)?;
        update.validate()?;

        let user = self
            .db
            .users()
            .update(org_id, user_id, update)
            .await
            .map_err(not_found_as("User", user_id))?;

        tracing::info!(org_id, user_id, "Replaced SCIM user");
        Ok(mapper::user_to_resource(&user, &self.base_url))
    }

    pub async fn patch_user(
        &self,
        org_id: i64,
        id: &str,
        request: &PatchRequest,
    ) -> ProvisioningResult<ScimUser> {
        let user_id = parse_id("User", id)?;
        let update = plan_user_patch(request);
        update.validate()?;

        let user = self
            .db
            .users()
            .update(org_id, user_id, update)
            .await
            .map_err(not_found_as("User", user_id))?;

        tracing::info!(
            org_id,
            user_id,
            operations = request.operations.len(),
            active = user.active,
            "Patched SCIM user"
        );
        Ok(mapper::user_to_resource(&user, &self.base_url))
    }

    pub async fn delete_user(&self, org_id: i64, id: &str) -> ProvisioningResult<()> {
        let user_id = parse_id("User", id)?;
        let removed = self
            .db
            .users()
            .delete(org_id, user_id)
            .await
            .map_err(not_found_as("User", user_id))?;

        tracing::info!(
            org_id,
            user_id,
            api_keys = removed.api_keys,
            memberships = removed.memberships,
            sso_identities = removed.sso_identities,
            links = removed.links,
            "Deleted SCIM user"
        );
        Ok(())
    }

    // =========================================================================
    // Groups
    // =========================================================================

    pub async fn list_groups(
        &self,
        org_id: i64,
        params: &ScimListParams,
    ) -> ProvisioningResult<ScimListResponse<ScimGroup>> {
        let filter = list_filter(params.filter.as_deref(), ScimResourceType::Group);
        let (start_index, page) = self.page(params);

        let result = self
            .db
            .groups()
            .list_filtered(org_id, filter.as_ref(), page)
            .await?;

        let resources = result
            .items
            .iter()
            .map(|g| mapper::group_to_resource(g, None, &self.base_url))
            .collect();
        Ok(ScimListResponse::new(resources, result.total, start_index))
    }

    pub async fn get_group(&self, org_id: i64, id: &str) -> ProvisioningResult<ScimGroup> {
        let group_id = parse_id("Group", id)?;
        let group = self
            .db
            .groups()
            .get(org_id, group_id)
            .await?
            .ok_or_else(|| not_found("Group", group_id))?;
        self.group_detail(org_id, &group).await
    }

    pub async fn create_group(
        &self,
        org_id: i64,
        request: ScimGroupRequest,
    ) -> ProvisioningResult<ScimGroup> {
        let input = mapper::create_group_from_request(request, self.max_members)?;
        input.validate()?;

        let group = self.db.groups().create(org_id, input).await?;

        tracing::info!(org_id, group_id = group.id, "Provisioned SCIM group");
        self.group_detail(org_id, &group).await
    }

    pub async fn replace_group(
        &self,
        org_id: i64,
        id: &str,
        request: ScimGroupRequest,
    ) -> ProvisioningResult<ScimGroup> {
        let group_id = parse_id("Group", id)?;
        let plan = mapper::replace_group_from_request(request, self.max_members)?;

        let group = self.apply_group_plan(org_id, group_id, plan).await?;
        tracing::info!(org_id, group_id, "Replaced SCIM group");
        self.group_detail(org_id, &group).await
    }

    pub async fn patch_group(
        &self,
        org_id: i64,
        id: &str,
        request: &PatchRequest,
    ) -> ProvisioningResult<ScimGroup> {
        let group_id = parse_id("Group", id)?;
        let plan = plan_group_patch(request, self.max_members)?;

        let membership_changes = plan.membership.len();
        let group = self.apply_group_plan(org_id, group_id, plan).await?;
        tracing::info!(
            org_id,
            group_id,
            operations = request.operations.len(),
            membership_changes,
            "Patched SCIM group"
        );
        self.group_detail(org_id, &group).await
    }

    pub async fn delete_group(&self, org_id: i64, id: &str) -> ProvisioningResult<()> {
        let group_id = parse_id("Group", id)?;
        let removed = self
            .db
            .groups()
            .delete(org_id, group_id)
            .await
            .map_err(not_found_as("Group", group_id))?;

        tracing::info!(
            org_id,
            group_id,
            memberships = removed.memberships,
            links = removed.links,
            "Deleted SCIM group"
        );
        Ok(())
    }

    async fn apply_group_plan(
        &self,
        org_id: i64,
        group_id: i64,
        plan: GroupPatch,
    ) -> ProvisioningResult<Group> {
        plan.update.validate()?;

        self.db
            .groups()
            .update(org_id, group_id, plan.update, &plan.membership)
            .await
            .map_err(not_found_as("Group", group_id))
    }

    async fn group_detail(&self, org_id: i64, group: &Group) -> ProvisioningResult<ScimGroup> {
        let members = self
            .db
            .memberships()
            .list_members(org_id, group.id)
            .await
            .map_err(not_found_as("Group", group.id))?;
        Ok(mapper::group_to_resource(
            group,
            Some(&members),
            &self.base_url,
        ))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        db::tests::harness::{create_sqlite_pool, run_sqlite_migrations},
        models::{CreateOrganization, MembershipRole},
        scim::ScimErrorType,
    };

    const BASE: &str = "http://localhost:8080/scim/v2";

    struct Ctx {
        service: ScimProvisioningService,
        db: Arc<DbPool>,
        org_a: i64,
        org_b: i64,
    }

    async fn ctx() -> Ctx {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        let db = Arc::new(DbPool::from_sqlite(pool));
        let mut orgs = Vec::new();
        for name in ["Org A", "Org B"] {
            let org = db
                .organizations()
                .create(CreateOrganization {
                    name: name.to_string(),
                })
                .await
                .unwrap();
            orgs.push(org.id);
        }
        Ctx {
            service: ScimProvisioningService::new(db.clone(), BASE, &ScimConfig::default()),
            db,
            org_a: orgs[0],
            org_b: orgs[1],
        }
    }

    fn user_body(user_name: &str) -> ScimUserRequest {
        serde_json::from_value(json!({"userName": user_name})).unwrap()
    }

    fn patch(operations: serde_json::Value) -> PatchRequest {
        PatchRequest::from_slice(json!({"Operations": operations}).to_string().as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_create_user_provisions_personal_group() {
        let ctx = ctx().await;
        let body: ScimUserRequest = serde_json::from_value(json!({
            "userName": "a@b.com",
            "name": {"givenName": "A", "familyName": "B"}
        }))
        .unwrap();

        let user = ctx.service.create_user(ctx.org_a, body).await.unwrap();
        assert_eq!(user.display_name, "A B");
        assert!(user.active);

        let groups = ctx
            .service
            .list_groups(ctx.org_a, &ScimListParams::default())
            .await
            .unwrap();
        assert_eq!(groups.total_results, 1);
        assert_eq!(groups.resources[0].display_name, "A B");

        let group_id: i64 = groups.resources[0].id.parse().unwrap();
        let members = ctx
            .db
            .memberships()
            .list_members(ctx.org_a, group_id)
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id.to_string(), user.id);
        assert_eq!(members[0].role, MembershipRole::Admin);
    }

    #[tokio::test]
    async fn test_create_user_validation_and_conflict() {
        let ctx = ctx().await;

        let missing = ctx
            .service
            .create_user(ctx.org_a, ScimUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(missing, ScimProvisioningError::Validation(_)));

        let not_email = ctx
            .service
            .create_user(ctx.org_a, user_body("not-an-email"))
            .await
            .unwrap_err();
        assert!(matches!(not_email, ScimProvisioningError::Validation(_)));

        ctx.service
            .create_user(ctx.org_a, user_body("dup@example.com"))
            .await
            .unwrap();
        let dup = ctx
            .service
            .create_user(ctx.org_b, user_body("DUP@example.com"))
            .await
            .unwrap_err();
        let response = ScimErrorResponse::from(dup);
        assert_eq!(response.status, "409");
        assert_eq!(response.scim_type, Some(ScimErrorType::Uniqueness));
    }

    #[tokio::test]
    async fn test_patch_user_deactivates() {
        let ctx = ctx().await;
        let user = ctx
            .service
            .create_user(ctx.org_a, user_body("p@example.com"))
            .await
            .unwrap();

        let patched = ctx
            .service
            .patch_user(
                ctx.org_a,
                &user.id,
                &patch(json!([{"op": "replace", "path": "active", "value": false}])),
            )
            .await
            .unwrap();
        assert!(!patched.active);
        assert!(patched.meta.last_modified >= user.meta.last_modified);

        let fetched = ctx.service.get_user(ctx.org_a, &user.id).await.unwrap();
        assert!(!fetched.active);
    }

    #[tokio::test]
    async fn test_patch_user_invalid_email_rejected() {
        let ctx = ctx().await;
        let user = ctx
            .service
            .create_user(ctx.org_a, user_body("v@example.com"))
            .await
            .unwrap();

        let err = ctx
            .service
            .patch_user(
                ctx.org_a,
                &user.id,
                &patch(json!([{"op": "replace", "path": "userName", "value": "nope"}])),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScimProvisioningError::Validation(_)));

        let fetched = ctx.service.get_user(ctx.org_a, &user.id).await.unwrap();
        assert_eq!(fetched.user_name, "v@example.com");
    }

    #[tokio::test]
    async fn test_org_isolation() {
        let ctx = ctx().await;
        let user = ctx
            .service
            .create_user(ctx.org_a, user_body("iso@example.com"))
            .await
            .unwrap();

        let get = ctx.service.get_user(ctx.org_b, &user.id).await.unwrap_err();
        assert!(matches!(get, ScimProvisioningError::NotFound { .. }));

        let patch_err = ctx
            .service
            .patch_user(
                ctx.org_b,
                &user.id,
                &patch(json!([{"op": "replace", "path": "active", "value": false}])),
            )
            .await
            .unwrap_err();
        assert!(matches!(patch_err, ScimProvisioningError::NotFound { .. }));

        let delete = ctx.service.delete_user(ctx.org_b, &user.id).await.unwrap_err();
        assert!(matches!(delete, ScimProvisioningError::NotFound { .. }));

        let listed = ctx
            .service
            .list_users(ctx.org_b, &ScimListParams::default())
            .await
            .unwrap();
        assert_eq!(listed.total_results, 0);

        assert!(ctx.service.get_user(ctx.org_a, &user.id).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_unparseable_id_is_not_found() {
        let ctx = ctx().await;
        let err = ctx.service.get_user(ctx.org_a, "abc").await.unwrap_err();
        assert_eq!(ScimErrorResponse::from(err).status, "404");
        let err = ctx.service.delete_group(ctx.org_a, "1.5").await.unwrap_err();
        assert!(matches!(err, ScimProvisioningError::NotFound { resource: "Group", .. }));
    }

    #[tokio::test]
    async fn test_list_filter_and_fallback() {
        let ctx = ctx().await;
        for email in ["one@example.com", "two@example.com", "three@example.com"] {
            ctx.service
                .create_user(ctx.org_a, user_body(email))
                .await
                .unwrap();
        }

        let filtered = ctx
            .service
            .list_users(
                ctx.org_a,
                &ScimListParams {
                    filter: Some(r#"userName eq "TWO@example.com""#.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(filtered.total_results, 1);
        assert_eq!(filtered.resources[0].user_name, "two@example.com");

        let fallback = ctx
            .service
            .list_users(
                ctx.org_a,
                &ScimListParams {
                    filter: Some(r#"title co "eng""#.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(fallback.total_results, 3);
    }

    #[tokio::test]
    async fn test_group_patch_membership() {
        let ctx = ctx().await;
        let mut ids = Vec::new();
        for email in ["m1@example.com", "m2@example.com", "m3@example.com"] {
            let user = ctx
                .service
                .create_user(ctx.org_a, user_body(email))
                .await
                .unwrap();
            ids.push(user.id);
        }

        let body: ScimGroupRequest = serde_json::from_value(json!({
            "displayName": "Engineering",
            "members": ids.iter().map(|id| json!({"value": id})).collect::<Vec<_>>()
        }))
        .unwrap();
        let group = ctx.service.create_group(ctx.org_a, body).await.unwrap();
        assert_eq!(group.members.as_ref().unwrap().len(), 3);

        let remove_second = patch(json!([
            {"op": "remove", "path": format!("members[value eq \"{}\"]", ids[1])}
        ]));
        let patched = ctx
            .service
            .patch_group(ctx.org_a, &group.id, &remove_second)
            .await
            .unwrap();
        let mut remaining: Vec<String> = patched
            .members
            .unwrap()
            .into_iter()
            .map(|m| m.value)
            .collect();
        remaining.sort();
        let mut expected = vec![ids[0].clone(), ids[2].clone()];
        expected.sort();
        assert_eq!(remaining, expected);

        let add_twice = patch(json!([
            {"op": "add", "path": "members", "value": [{"value": ids[1]}]},
            {"op": "add", "path": "members", "value": [{"value": ids[1]}]}
        ]));
        let patched = ctx
            .service
            .patch_group(ctx.org_a, &group.id, &add_twice)
            .await
            .unwrap();
        assert_eq!(patched.members.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_group_member_cap_rejected_before_write() {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        let db = Arc::new(DbPool::from_sqlite(pool));
        let org = db
            .organizations()
            .create(CreateOrganization {
                name: "Capped".to_string(),
            })
            .await
            .unwrap();
        let service = ScimProvisioningService::new(
            db,
            BASE,
            &ScimConfig {
                max_members_per_request: 2,
                ..Default::default()
            },
        );

        let body: ScimGroupRequest = serde_json::from_value(json!({
            "displayName": "Too Big",
            "members": [{"value": "1"}, {"value": "2"}, {"value": "3"}]
        }))
        .unwrap();
        let err = service.create_group(org.id, body).await.unwrap_err();
        assert!(matches!(err, ScimProvisioningError::Validation(_)));

        let groups = service
            .list_groups(org.id, &ScimListParams::default())
            .await
            .unwrap();
        assert_eq!(groups.total_results, 0);
    }

    #[tokio::test]
    async fn test_replace_group_without_members_empties_it() {
        let ctx = ctx().await;
        let user = ctx
            .service
            .create_user(ctx.org_a, user_body("r@example.com"))
            .await
            .unwrap();
        let group = ctx
            .service
            .create_group(
                ctx.org_a,
                serde_json::from_value(json!({
                    "displayName": "Ops",
                    "members": [{"value": user.id}]
                }))
                .unwrap(),
            )
            .await
            .unwrap();

        let replaced = ctx
            .service
            .replace_group(
                ctx.org_a,
                &group.id,
                serde_json::from_value(json!({"displayName": "Ops 2"})).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(replaced.display_name, "Ops 2");
        assert_eq!(replaced.members, Some(vec![]));
    }
}
