//! SCIM 2.0 Error Types
//!
//! Error envelope per RFC 7644 Section 3.12. Every failure the SCIM surface
//! returns, including authentication failures, uses this shape.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::types::{SCHEMA_ERROR, SCIM_CONTENT_TYPE};

/// SCIM error response per RFC 7644.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimErrorResponse {
    /// SCIM schema URIs (always contains the Error schema)
    pub schemas: Vec<String>,

    /// HTTP status code as a string (e.g., "400", "404")
    pub status: String,

    /// SCIM-specific error type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<ScimErrorType>,

    /// Human-readable error detail
    pub detail: String,
}

impl ScimErrorResponse {
    fn new(
        status: StatusCode,
        scim_type: Option<ScimErrorType>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            schemas: vec![SCHEMA_ERROR.to_string()],
            status: status.as_u16().to_string(),
            scim_type,
            detail: detail.into(),
        }
    }

    /// Invalid attribute value or malformed request (400)
    pub fn invalid_value(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(ScimErrorType::InvalidValue),
            detail,
        )
    }

    /// Authentication required (401)
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, None, detail)
    }

    /// Resource not found (404)
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, None, detail)
    }

    /// Uniqueness constraint violation (409)
    pub fn uniqueness(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            Some(ScimErrorType::Uniqueness),
            detail,
        )
    }

    /// Internal server error (500)
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, None, detail)
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        self.status
            .parse::<u16>()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ScimErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            [(header::CONTENT_TYPE, SCIM_CONTENT_TYPE)],
            Json(self),
        )
            .into_response()
    }
}

/// SCIM error types per RFC 7644 Section 3.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimErrorType {
    /// Uniqueness constraint violated (e.g., duplicate userName)
    Uniqueness,

    /// Attribute value is invalid for its type, or the request is malformed
    InvalidValue,
}

impl std::fmt::Display for ScimErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScimErrorType::Uniqueness => write!(f, "uniqueness"),
            ScimErrorType::InvalidValue => write!(f, "invalidValue"),
        }
    }
}

/// Result type for SCIM handlers
pub type ScimResult<T> = Result<T, ScimErrorResponse>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_envelope() {
        let err = ScimErrorResponse::invalid_value("Operations must not be empty");

        assert_eq!(err.status, "400");
        assert_eq!(err.scim_type, Some(ScimErrorType::InvalidValue));

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["scimType"], "invalidValue");
        assert_eq!(json["status"], "400");
        assert_eq!(json["schemas"][0], SCHEMA_ERROR);
    }

    #[test]
    fn test_not_found_omits_scim_type() {
        let err = ScimErrorResponse::not_found("User 12345 not found");

        assert_eq!(err.status, "404");
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("scimType"));
    }

    #[test]
    fn test_uniqueness() {
        let err =
            ScimErrorResponse::uniqueness("User with userName 'john@example.com' already exists");

        assert_eq!(err.status, "409");
        assert_eq!(err.scim_type, Some(ScimErrorType::Uniqueness));
    }

    #[test]
    fn test_status_code() {
        assert_eq!(
            ScimErrorResponse::invalid_value("test").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScimErrorResponse::unauthorized("test").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ScimErrorResponse::not_found("test").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ScimErrorResponse::uniqueness("test").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ScimErrorResponse::internal("test").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_sets_scim_content_type() {
        let response = ScimErrorResponse::not_found("gone").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            SCIM_CONTENT_TYPE
        );
    }
}
