//! SCIM 2.0 Group Resource Endpoints
//!
//! Group responses from get, create, replace and patch include `members`;
//! list responses never do.

use axum::{
    Extension,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::{ScimJson, parse_json_body};
use crate::{
    AppState,
    scim::{
        PatchRequest, ScimGroup, ScimGroupRequest, ScimListParams, ScimListResponse, ScimResult,
    },
    services::{ScimAuth, ScimProvisioningError},
};

/// `GET /scim/v2/Groups`
#[tracing::instrument(
    name = "scim.groups.list",
    skip_all,
    fields(org_id = scim_auth.org_id)
)]
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    Query(params): Query<ScimListParams>,
) -> ScimResult<ScimJson<ScimListResponse<ScimGroup>>> {
    let response = state
        .services
        .scim_provisioning
        .list_groups(scim_auth.org_id, &params)
        .await?;
    Ok(ScimJson::ok(response))
}

/// `POST /scim/v2/Groups`
#[tracing::instrument(name = "scim.groups.create", skip_all, fields(org_id = scim_auth.org_id))]
pub async fn create_group(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    body: Bytes,
) -> ScimResult<ScimJson<ScimGroup>> {
    let request: ScimGroupRequest = parse_json_body(&body)?;
    let created = state
        .services
        .scim_provisioning
        .create_group(scim_auth.org_id, request)
        .await?;
    Ok(ScimJson::created(created))
}

/// `GET /scim/v2/Groups/{id}`
#[tracing::instrument(
    name = "scim.groups.get",
    skip_all,
    fields(org_id = scim_auth.org_id, %id)
)]
pub async fn get_group(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    Path(id): Path<String>,
) -> ScimResult<ScimJson<ScimGroup>> {
    let group = state
        .services
        .scim_provisioning
        .get_group(scim_auth.org_id, &id)
        .await?;
    Ok(ScimJson::ok(group))
}

/// Replace a group, including its full member set.
///
/// `PUT /scim/v2/Groups/{id}`
#[tracing::instrument(
    name = "scim.groups.replace",
    skip_all,
    fields(org_id = scim_auth.org_id, %id)
)]
pub async fn replace_group(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    Path(id): Path<String>,
    body: Bytes,
) -> ScimResult<ScimJson<ScimGroup>> {
    let request: ScimGroupRequest = parse_json_body(&body)?;
    let group = state
        .services
        .scim_provisioning
        .replace_group(scim_auth.org_id, &id, request)
        .await?;
    Ok(ScimJson::ok(group))
}

/// Partially update a group: rename it or add/remove members.
///
/// `PATCH /scim/v2/Groups/{id}`
#[tracing::instrument(
    name = "scim.groups.patch",
    skip_all,
    fields(org_id = scim_auth.org_id, %id)
)]
pub async fn patch_group(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    Path(id): Path<String>,
    body: Bytes,
) -> ScimResult<ScimJson<ScimGroup>> {
    let patch = PatchRequest::from_slice(&body).map_err(ScimProvisioningError::from)?;
    let group = state
        .services
        .scim_provisioning
        .patch_group(scim_auth.org_id, &id, &patch)
        .await?;
    Ok(ScimJson::ok(group))
}

/// `DELETE /scim/v2/Groups/{id}`
#[tracing::instrument(
    name = "scim.groups.delete",
    skip_all,
    fields(org_id = scim_auth.org_id, %id)
)]
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(scim_auth): Extension<ScimAuth>,
    Path(id): Path<String>,
) -> ScimResult<StatusCode> {
    state
        .services
        .scim_provisioning
        .delete_group(scim_auth.org_id, &id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
