//! SCIM 2.0 Discovery Endpoints
//!
//! Implements RFC 7644 Section 4 discovery endpoints:
//! - ServiceProviderConfig: Advertises service capabilities
//! - ResourceTypes: Lists supported resource types (User, Group)
//! - Schemas: Lists and retrieves schema definitions

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use super::ScimJson;
use crate::{
    AppState,
    scim::{
        ResourceType, SCHEMA_GROUP, SCHEMA_USER, ScimErrorResponse, ScimListResponse, ScimSchema,
        ServiceProviderConfig,
    },
};

/// `GET /scim/v2/ServiceProviderConfig`
#[tracing::instrument(name = "scim.discovery.service_provider_config", skip_all)]
pub async fn service_provider_config(State(state): State<AppState>) -> impl IntoResponse {
    ScimJson::ok(ServiceProviderConfig::new(state.config.scim.max_page_size))
}

/// `GET /scim/v2/ResourceTypes`
#[tracing::instrument(name = "scim.discovery.resource_types", skip_all)]
pub async fn resource_types(State(state): State<AppState>) -> impl IntoResponse {
    let base_url = state.services.scim_provisioning.base_url();
    let resource_types = vec![ResourceType::user(base_url), ResourceType::group(base_url)];

    ScimJson::ok(ScimListResponse::new(resource_types, 2, 1))
}

/// `GET /scim/v2/ResourceTypes/{id}`
#[tracing::instrument(name = "scim.discovery.resource_type", skip_all, fields(%id))]
pub async fn resource_type(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let base_url = state.services.scim_provisioning.base_url();

    match id.as_str() {
        "User" => ScimJson::ok(ResourceType::user(base_url)).into_response(),
        "Group" => ScimJson::ok(ResourceType::group(base_url)).into_response(),
        _ => ScimErrorResponse::not_found(format!("ResourceType '{id}' not found")).into_response(),
    }
}

/// `GET /scim/v2/Schemas`
#[tracing::instrument(name = "scim.discovery.schemas", skip_all)]
pub async fn schemas(State(state): State<AppState>) -> impl IntoResponse {
    let base_url = state.services.scim_provisioning.base_url();
    let schemas = vec![ScimSchema::user(base_url), ScimSchema::group(base_url)];

    ScimJson::ok(ScimListResponse::new(schemas, 2, 1))
}

/// `GET /scim/v2/Schemas/{id}`
///
/// The id is a schema URN. Axum's Path extractor URL-decodes the segment, so
/// both the raw and the percent-encoded form resolve.
#[tracing::instrument(name = "scim.discovery.schema", skip_all, fields(%id))]
pub async fn schema(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let base_url = state.services.scim_provisioning.base_url();

    match id.as_str() {
        s if s == SCHEMA_USER => ScimJson::ok(ScimSchema::user(base_url)).into_response(),
        s if s == SCHEMA_GROUP => ScimJson::ok(ScimSchema::group(base_url)).into_response(),
        _ => ScimErrorResponse::not_found(format!("Schema '{id}' not found")).into_response(),
    }
}
