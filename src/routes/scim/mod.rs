//! SCIM 2.0 Protocol Routes
//!
//! Endpoints per RFC 7643 (Core Schema) and RFC 7644 (Protocol), mounted
//! under `/scim/v2`:
//!
//! **Discovery Endpoints:**
//! - `GET /ServiceProviderConfig` - Service capabilities
//! - `GET /ResourceTypes[/{id}]` - Supported resource types
//! - `GET /Schemas[/{id}]` - Supported schemas
//!
//! **Resource Endpoints:**
//! - `GET/POST /Users` - List/create users
//! - `GET/PUT/PATCH/DELETE /Users/{id}` - User operations
//! - `GET/POST /Groups` - List/create groups
//! - `GET/PUT/PATCH/DELETE /Groups/{id}` - Group operations
//!
//! Every route requires an organization-scoped bearer token.

pub mod discovery;
pub mod groups;
pub mod middleware;
pub mod users;

use axum::{
    Json, Router,
    body::Bytes,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    AppState,
    scim::{SCIM_CONTENT_TYPE, ScimErrorResponse, ScimResult},
};

/// Build the SCIM routes with bearer token authentication applied.
///
/// The caller nests the returned router under [`crate::config::SCIM_MOUNT_PATH`].
pub fn scim_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/ServiceProviderConfig",
            get(discovery::service_provider_config),
        )
        .route("/ResourceTypes", get(discovery::resource_types))
        .route("/ResourceTypes/{id}", get(discovery::resource_type))
        .route("/Schemas", get(discovery::schemas))
        .route("/Schemas/{id}", get(discovery::schema))
        .route("/Users", get(users::list_users).post(users::create_user))
        .route(
            "/Users/{id}",
            get(users::get_user)
                .put(users::replace_user)
                .patch(users::patch_user)
                .delete(users::delete_user),
        )
        .route("/Groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/Groups/{id}",
            get(groups::get_group)
                .put(groups::replace_group)
                .patch(groups::patch_group)
                .delete(groups::delete_group),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::scim_auth_middleware,
        ))
}

/// SCIM JSON response with `application/scim+json` and an explicit status.
pub struct ScimJson<T> {
    body: T,
    status: StatusCode,
}

impl<T: Serialize> ScimJson<T> {
    pub fn ok(body: T) -> Self {
        Self {
            body,
            status: StatusCode::OK,
        }
    }

    pub fn created(body: T) -> Self {
        Self {
            body,
            status: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ScimJson<T> {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, SCIM_CONTENT_TYPE)],
            Json(self.body),
        )
            .into_response()
    }
}

/// Parse a request body as JSON.
///
/// Bodies are read as raw bytes so that both `application/json` and
/// `application/scim+json` are accepted.
pub(crate) fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> ScimResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| ScimErrorResponse::invalid_value(format!("Invalid JSON body: {e}")))
}
