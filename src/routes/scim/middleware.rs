//! SCIM Bearer Token Authentication Middleware
//!
//! Every SCIM request carries an organization-scoped bearer token. The token
//! is resolved to a [`ScimAuth`] which handlers read from request extensions.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    scim::ScimErrorResponse,
    services::{ScimAuth, ScimTokenError},
};

/// SCIM bearer token authentication middleware.
///
/// Extracts the bearer token from the Authorization header, validates it
/// against the database, and injects `ScimAuth` into request extensions.
pub async fn scim_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(&request) else {
        return ScimErrorResponse::unauthorized(
            "Missing or invalid Authorization header. Expected: Bearer <token>",
        )
        .into_response();
    };

    let auth: ScimAuth = match state.services.scim_tokens.authenticate(token).await {
        Ok(auth) => auth,
        Err(ScimTokenError::Database(e)) => {
            tracing::error!(error = %e, "SCIM authentication error");
            return ScimErrorResponse::internal("Internal server error").into_response();
        }
        Err(e) => {
            tracing::debug!(reason = %e, "SCIM authentication failed");
            return ScimErrorResponse::unauthorized("Invalid SCIM bearer token").into_response();
        }
    };

    request.extensions_mut().insert(auth);

    next.run(request).await
}

/// Extract bearer token from the Authorization header.
///
/// Expects format: `Authorization: Bearer <token>`, scheme matched
/// case-insensitively. Returns the token portion, which may be empty.
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    let auth_header = request.headers().get(header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;

    let (scheme, token) = auth_str.split_at_checked(7)?;
    if scheme.eq_ignore_ascii_case("Bearer ") {
        Some(token.trim())
    } else {
        None
    }
}
