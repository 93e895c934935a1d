//! SCIM 2.0 User Resource Endpoints
//!
//! Implements RFC 7644 Section 3 CRUD operations for User resources:
//! - POST /Users: Create user
//! - GET /Users: List/search users
//! - GET /Users/{id}: Get user by ID
//! - PUT /Users/{id}: Replace user (full update)
//! - PATCH /Users/{id}: Partial update
//! - DELETE /Users/{id}: Delete user

use axum::{
    Extension,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::{ScimJson, parse_json_body};
use crate::{
    AppState,
    scim::{PatchRequest, ScimListParams, ScimListResponse, ScimResult, ScimUser, ScimUserRequest},
    services::{ScimAuth, ScimProvisioningError},
};

/// List users with optional filter and pagination.
///
/// `GET /scim/v2/Users`
///
/// Query parameters:
/// - `filter`: `attr eq "value"` on `userName` or `externalId`
/// - `startIndex`: 1-based pagination start (default: 1)
/// - `count`: Results per page
#[tracing::instrument(
    name = "scim.users.list",
    skip_all,
    fields(org_id = scim_auth.org_id)
)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    Query(params): Query<ScimListParams>,
) -> ScimResult<ScimJson<ScimListResponse<ScimUser>>> {
    let response = state
        .services
        .scim_provisioning
        .list_users(scim_auth.org_id, &params)
        .await?;
    Ok(ScimJson::ok(response))
}

/// Create a new user along with their personal group.
///
/// `POST /scim/v2/Users`
#[tracing::instrument(name = "scim.users.create", skip_all, fields(org_id = scim_auth.org_id))]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    body: Bytes,
) -> ScimResult<ScimJson<ScimUser>> {
    let request: ScimUserRequest = parse_json_body(&body)?;
    let created = state
        .services
        .scim_provisioning
        .create_user(scim_auth.org_id, request)
        .await?;
    Ok(ScimJson::created(created))
}

/// `GET /scim/v2/Users/{id}`
#[tracing::instrument(
    name = "scim.users.get",
    skip_all,
    fields(org_id = scim_auth.org_id, %id)
)]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    Path(id): Path<String>,
) -> ScimResult<ScimJson<ScimUser>> {
    let user = state
        .services
        .scim_provisioning
        .get_user(scim_auth.org_id, &id)
        .await?;
    Ok(ScimJson::ok(user))
}

/// Replace a user's attributes.
///
/// `PUT /scim/v2/Users/{id}`
///
/// Every scalar attribute is overwritten; omitted optional attributes are
/// cleared. An omitted `active` leaves the current state unchanged.
#[tracing::instrument(
    name = "scim.users.replace",
    skip_all,
    fields(org_id = scim_auth.org_id, %id)
)]
pub async fn replace_user(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    Path(id): Path<String>,
    body: Bytes,
) -> ScimResult<ScimJson<ScimUser>> {
    let request: ScimUserRequest = parse_json_body(&body)?;
    let user = state
        .services
        .scim_provisioning
        .replace_user(scim_auth.org_id, &id, request)
        .await?;
    Ok(ScimJson::ok(user))
}

/// Partially update a user.
///
/// `PATCH /scim/v2/Users/{id}`
///
/// This is how identity providers deactivate users:
/// `{"op": "replace", "path": "active", "value": false}`.
#[tracing::instrument(
    name = "scim.users.patch",
    skip_all,
    fields(org_id = scim_auth.org_id, %id)
)]
pub async fn patch_user(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    Path(id): Path<String>,
    body: Bytes,
) -> ScimResult<ScimJson<ScimUser>> {
    let patch = PatchRequest::from_slice(&body).map_err(ScimProvisioningError::from)?;
    let user = state
        .services
        .scim_provisioning
        .patch_user(scim_auth.org_id, &id, &patch)
        .await?;
    Ok(ScimJson::ok(user))
}

/// Delete a user and everything that references it.
///
/// `DELETE /scim/v2/Users/{id}`
#[tracing::instrument(
    name = "scim.users.delete",
    skip_all,
    fields(org_id = scim_auth.org_id, %id)
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    Path(id): Path<String>,
) -> ScimResult<StatusCode> {
    state
        .services
        .scim_provisioning
        .delete_user(scim_auth.org_id, &id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
