//! SCIM 2.0 Resource and Protocol Types
//!
//! Outbound resource types (User, Group), inbound request bodies, and the
//! discovery documents (ServiceProviderConfig, ResourceType, Schema) per
//! RFC 7643/7644.
//!
//! Inbound bodies are deserialized leniently. Identity providers disagree on
//! details the RFC leaves loose:
//!
//! - Azure AD omits `schemas` and sends booleans as `"True"`/`"False"` strings
//! - Okta sends `""` for unset attributes and wraps scalars in one-element arrays
//! - OneLogin sends explicit `null`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;

// =============================================================================
// Schema URIs
// =============================================================================

/// SCIM Core User schema URI
pub const SCHEMA_USER: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// SCIM Core Group schema URI
pub const SCHEMA_GROUP: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

/// SCIM ListResponse schema URI
pub const SCHEMA_LIST_RESPONSE: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

/// SCIM Error schema URI
pub const SCHEMA_ERROR: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// SCIM PatchOp schema URI
pub const SCHEMA_PATCH_OP: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// SCIM ServiceProviderConfig schema URI
pub const SCHEMA_SERVICE_PROVIDER_CONFIG: &str =
    "urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig";

/// SCIM ResourceType schema URI
pub const SCHEMA_RESOURCE_TYPE: &str = "urn:ietf:params:scim:schemas:core:2.0:ResourceType";

/// SCIM Schema schema URI
pub const SCHEMA_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Schema";

/// Media type for every SCIM response body (RFC 7644 Section 3.1)
pub const SCIM_CONTENT_TYPE: &str = "application/scim+json";

// =============================================================================
// Lenient scalar coercion
// =============================================================================

/// Read a JSON value as a non-empty string.
///
/// Numbers are stringified, one-element arrays are unwrapped, and empty
/// strings count as absent.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) if items.len() == 1 => scalar_string(&items[0]),
        _ => None,
    }
}

/// Read a JSON value as a boolean, accepting `"true"`/`"false"` in any case.
pub fn scalar_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        Value::Array(items) if items.len() == 1 => scalar_bool(&items[0]),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_string))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_bool(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected a boolean or \"true\"/\"false\"")),
    }
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Resource Metadata
// =============================================================================

/// Resource metadata common to all SCIM resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimMeta {
    /// The resource type (e.g., "User", "Group")
    pub resource_type: String,

    pub created: DateTime<Utc>,

    pub last_modified: DateTime<Utc>,

    /// The absolute URI of the resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ScimMeta {
    /// Create metadata for a User resource
    pub fn user(created: DateTime<Utc>, last_modified: DateTime<Utc>) -> Self {
        Self {
            resource_type: "User".to_string(),
            created,
            last_modified,
            location: None,
        }
    }

    /// Create metadata for a Group resource
    pub fn group(created: DateTime<Utc>, last_modified: DateTime<Utc>) -> Self {
        Self {
            resource_type: "Group".to_string(),
            created,
            last_modified,
            location: None,
        }
    }

    /// Set the location URI
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

// =============================================================================
// User Resource (RFC 7643)
// =============================================================================

/// SCIM User resource as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    pub schemas: Vec<String>,

    /// Server-assigned identifier (decimal form of the internal key)
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Unique identifier for the user (the email address)
    pub user_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<ScimName>,

    pub display_name: String,

    #[serde(default)]
    pub emails: Vec<ScimEmail>,

    pub active: bool,

    pub meta: ScimMeta,
}

/// User's name components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimName {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub given_name: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub family_name: Option<String>,

    /// Accepted on input, never stored
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub formatted: Option<String>,
}

impl ScimName {
    pub fn is_empty(&self) -> bool {
        self.given_name.is_none() && self.family_name.is_none()
    }

    /// `"given family"`, trimmed. `None` when both parts are absent.
    pub fn joined(&self) -> Option<String> {
        let joined = format!(
            "{} {}",
            self.given_name.as_deref().unwrap_or_default(),
            self.family_name.as_deref().unwrap_or_default()
        );
        let joined = joined.trim();
        (!joined.is_empty()).then(|| joined.to_string())
    }
}

/// Email address with type and primary flag
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimEmail {
    pub value: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

impl ScimEmail {
    /// Create a primary work email
    pub fn work_primary(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            email_type: Some("work".to_string()),
            primary: Some(true),
        }
    }
}

// =============================================================================
// Group Resource (RFC 7643)
// =============================================================================

/// SCIM Group resource as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroup {
    pub schemas: Vec<String>,

    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    pub display_name: String,

    /// Present on detail views only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<ScimGroupMember>>,

    pub meta: ScimMeta,
}

/// Group member reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScimGroupMember {
    /// User ID
    pub value: String,

    /// URI reference to the user
    #[serde(rename = "$ref")]
    pub ref_uri: String,

    /// Display name of the member
    pub display: String,
}

// =============================================================================
// Inbound request bodies
// =============================================================================

/// Body of `POST /Users` and `PUT /Users/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUserRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub external_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub display_name: Option<String>,

    #[serde(default)]
    pub name: Option<ScimName>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub active: Option<bool>,
}

/// Body of `POST /Groups` and `PUT /Groups/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroupRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub external_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_vec")]
    pub members: Vec<ScimMemberRef>,
}

/// Member reference in an inbound group body or PATCH value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScimMemberRef {
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: Option<String>,
}

// =============================================================================
// Protocol Types (RFC 7644)
// =============================================================================

/// SCIM list response for paginated collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListResponse<T> {
    pub schemas: Vec<String>,

    /// Filtered, unpaged result count
    pub total_results: i64,

    /// Number of results returned in this response
    pub items_per_page: i64,

    /// 1-based index of the first result in this response
    pub start_index: i64,

    #[serde(rename = "Resources")]
    pub resources: Vec<T>,
}

impl<T> ScimListResponse<T> {
    pub fn new(resources: Vec<T>, total_results: i64, start_index: i64) -> Self {
        Self {
            schemas: vec![SCHEMA_LIST_RESPONSE.to_string()],
            total_results,
            items_per_page: resources.len() as i64,
            start_index,
            resources,
        }
    }
}

/// Query parameters for list operations.
///
/// Numbers arrive as raw strings so that garbage values fall back to the
/// defaults instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListParams {
    pub filter: Option<String>,
    pub start_index: Option<String>,
    pub count: Option<String>,
}

impl ScimListParams {
    /// Resolve `(start_index, count)`: start index clamped to at least 1,
    /// count clamped to `[1, max_count]`.
    pub fn resolve(&self, default_count: i64, max_count: i64) -> (i64, i64) {
        let parse =
            |raw: &Option<String>| raw.as_deref().and_then(|s| s.trim().parse::<i64>().ok());

        let start_index = parse(&self.start_index).unwrap_or(1).max(1);
        let count = parse(&self.count)
            .unwrap_or(default_count)
            .clamp(1, max_count.max(1));
        (start_index, count)
    }
}

// =============================================================================
// Discovery Types (RFC 7644 Section 4)
// =============================================================================

/// Service Provider Configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderConfig {
    pub schemas: Vec<String>,
    pub patch: FeatureSupport,
    pub bulk: BulkSupport,
    pub filter: FilterSupport,
    pub change_password: FeatureSupport,
    pub sort: FeatureSupport,
    pub etag: FeatureSupport,
    pub authentication_schemes: Vec<AuthenticationScheme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ScimMeta>,
}

impl ServiceProviderConfig {
    /// Capabilities of this service. `max_results` is the page-size cap.
    pub fn new(max_results: i64) -> Self {
        Self {
            schemas: vec![SCHEMA_SERVICE_PROVIDER_CONFIG.to_string()],
            patch: FeatureSupport { supported: true },
            bulk: BulkSupport::unsupported(),
            filter: FilterSupport {
                supported: true,
                max_results,
            },
            change_password: FeatureSupport { supported: false },
            sort: FeatureSupport { supported: false },
            etag: FeatureSupport { supported: false },
            authentication_schemes: vec![AuthenticationScheme::oauth_bearer()],
            meta: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSupport {
    pub supported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSupport {
    pub supported: bool,
    pub max_operations: u32,
    pub max_payload_size: u32,
}

impl BulkSupport {
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            max_operations: 0,
            max_payload_size: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSupport {
    pub supported: bool,
    pub max_results: i64,
}

/// Authentication scheme definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationScheme {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_uri: Option<String>,
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

impl AuthenticationScheme {
    /// OAuth 2.0 Bearer Token scheme
    pub fn oauth_bearer() -> Self {
        Self {
            name: "OAuth 2.0 Bearer Token".to_string(),
            description: "Authentication with an organization-scoped SCIM bearer token"
                .to_string(),
            spec_uri: Some("https://tools.ietf.org/html/rfc6750".to_string()),
            scheme_type: "oauthbearertoken".to_string(),
            primary: Some(true),
        }
    }
}

/// Resource type definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    pub schemas: Vec<String>,

    /// Resource type identifier (e.g., "User")
    pub id: String,

    pub name: String,

    /// Endpoint path (e.g., "/Users")
    pub endpoint: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Primary schema URI for this resource type
    pub schema: String,

    pub meta: ResourceMetaLocation,
}

/// Metadata block of a discovery document. Discovery documents are static,
/// so they carry no timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetaLocation {
    pub resource_type: String,
    pub location: String,
}

impl ResourceType {
    pub fn user(base_url: &str) -> Self {
        Self {
            schemas: vec![SCHEMA_RESOURCE_TYPE.to_string()],
            id: "User".to_string(),
            name: "User".to_string(),
            endpoint: "/Users".to_string(),
            description: Some("User account".to_string()),
            schema: SCHEMA_USER.to_string(),
            meta: ResourceMetaLocation {
                resource_type: "ResourceType".to_string(),
                location: format!("{base_url}/ResourceTypes/User"),
            },
        }
    }

    pub fn group(base_url: &str) -> Self {
        Self {
            schemas: vec![SCHEMA_RESOURCE_TYPE.to_string()],
            id: "Group".to_string(),
            name: "Group".to_string(),
            endpoint: "/Groups".to_string(),
            description: Some("Group of users".to_string()),
            schema: SCHEMA_GROUP.to_string(),
            meta: ResourceMetaLocation {
                resource_type: "ResourceType".to_string(),
                location: format!("{base_url}/ResourceTypes/Group"),
            },
        }
    }
}

// =============================================================================
// Schema Definition Types (RFC 7643 Section 7)
// =============================================================================

/// SCIM Schema definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimSchema {
    pub schemas: Vec<String>,

    /// Schema URI (e.g., "urn:ietf:params:scim:schemas:core:2.0:User")
    pub id: String,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub attributes: Vec<SchemaAttribute>,

    pub meta: ResourceMetaLocation,
}

impl ScimSchema {
    /// The attributes this service stores for a User.
    pub fn user(base_url: &str) -> Self {
        Self {
            schemas: vec![SCHEMA_SCHEMA.to_string()],
            id: SCHEMA_USER.to_string(),
            name: "User".to_string(),
            description: Some("User account".to_string()),
            attributes: vec![
                SchemaAttribute::string("userName", "Email address of the user", true)
                    .unique(),
                SchemaAttribute::complex(
                    "name",
                    "Name components",
                    vec![
                        SchemaAttribute::string("givenName", "Given name", false),
                        SchemaAttribute::string("familyName", "Family name", false),
                    ],
                ),
                SchemaAttribute::string("displayName", "Display name", false),
                SchemaAttribute::complex(
                    "emails",
                    "Email addresses; mirrors userName",
                    vec![
                        SchemaAttribute::string("value", "Email address", false),
                        SchemaAttribute::string("type", "Email type", false),
                        SchemaAttribute::boolean("primary", "Primary email flag"),
                    ],
                )
                .multi_valued()
                .read_only(),
                SchemaAttribute::boolean("active", "Whether the user may sign in"),
                SchemaAttribute::string("externalId", "Identifier assigned by the IdP", false)
                    .case_exact(),
            ],
            meta: ResourceMetaLocation {
                resource_type: "Schema".to_string(),
                location: format!("{base_url}/Schemas/{SCHEMA_USER}"),
            },
        }
    }

    /// The attributes this service stores for a Group.
    pub fn group(base_url: &str) -> Self {
        Self {
            schemas: vec![SCHEMA_SCHEMA.to_string()],
            id: SCHEMA_GROUP.to_string(),
            name: "Group".to_string(),
            description: Some("Group of users".to_string()),
            attributes: vec![
                SchemaAttribute::string("displayName", "Human-readable group name", true),
                SchemaAttribute::complex(
                    "members",
                    "Group members",
                    vec![
                        SchemaAttribute::string("value", "Member user id", false).immutable(),
                        SchemaAttribute::string("$ref", "Member URI", false).immutable(),
                        SchemaAttribute::string("display", "Member display name", false)
                            .read_only(),
                    ],
                )
                .multi_valued(),
                SchemaAttribute::string("externalId", "Identifier assigned by the IdP", false)
                    .case_exact(),
            ],
            meta: ResourceMetaLocation {
                resource_type: "Schema".to_string(),
                location: format!("{base_url}/Schemas/{SCHEMA_GROUP}"),
            },
        }
    }
}

/// SCIM attribute definition within a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAttribute {
    pub name: String,

    #[serde(rename = "type")]
    pub attr_type: AttributeType,

    pub multi_valued: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub required: bool,

    /// Only meaningful for strings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_exact: Option<bool>,

    pub mutability: Mutability,

    pub returned: Returned,

    pub uniqueness: Uniqueness,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_attributes: Vec<SchemaAttribute>,
}

impl SchemaAttribute {
    fn base(name: &str, attr_type: AttributeType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            attr_type,
            multi_valued: false,
            description: Some(description.to_string()),
            required: false,
            case_exact: None,
            mutability: Mutability::ReadWrite,
            returned: Returned::Default,
            uniqueness: Uniqueness::None,
            sub_attributes: Vec::new(),
        }
    }

    pub fn string(name: &str, description: &str, required: bool) -> Self {
        Self {
            required,
            case_exact: Some(false),
            ..Self::base(name, AttributeType::String, description)
        }
    }

    pub fn boolean(name: &str, description: &str) -> Self {
        Self::base(name, AttributeType::Boolean, description)
    }

    pub fn complex(name: &str, description: &str, sub_attributes: Vec<SchemaAttribute>) -> Self {
        Self {
            sub_attributes,
            ..Self::base(name, AttributeType::Complex, description)
        }
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn case_exact(mut self) -> Self {
        self.case_exact = Some(true);
        self
    }

    pub fn unique(mut self) -> Self {
        self.uniqueness = Uniqueness::Server;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.mutability = Mutability::ReadOnly;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.mutability = Mutability::Immutable;
        self
    }
}

/// SCIM attribute data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Boolean,
    Complex,
}

/// SCIM attribute mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    ReadOnly,
    ReadWrite,
    Immutable,
}

/// SCIM attribute return behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Returned {
    Default,
}

/// SCIM attribute uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Uniqueness {
    None,
    Server,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_user_request_tolerates_idp_quirks() {
        // Azure AD: no schemas, string boolean
        let azure: ScimUserRequest = serde_json::from_value(json!({
            "userName": "azure@example.com",
            "active": "False",
            "name": {"givenName": "Az", "familyName": "Ure"}
        }))
        .unwrap();
        assert_eq!(azure.user_name.as_deref(), Some("azure@example.com"));
        assert_eq!(azure.active, Some(false));

        // Okta: empty strings mean unset
        let okta: ScimUserRequest = serde_json::from_value(json!({
            "schemas": [SCHEMA_USER],
            "userName": "okta@example.com",
            "externalId": "",
            "displayName": "",
            "active": true
        }))
        .unwrap();
        assert_eq!(okta.external_id, None);
        assert_eq!(okta.display_name, None);

        // OneLogin: explicit nulls
        let onelogin: ScimUserRequest = serde_json::from_value(json!({
            "userName": "onelogin@example.com",
            "externalId": null,
            "name": null,
            "active": null
        }))
        .unwrap();
        assert_eq!(onelogin.external_id, None);
        assert!(onelogin.name.is_none());
        assert_eq!(onelogin.active, None);
    }

    #[test]
    fn test_user_request_ignores_unknown_fields() {
        let request: ScimUserRequest = serde_json::from_value(json!({
            "userName": "x@example.com",
            "phoneNumbers": [{"value": "555"}],
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User": {"department": "R&D"}
        }))
        .unwrap();
        assert_eq!(request.user_name.as_deref(), Some("x@example.com"));
    }

    #[test]
    fn test_user_request_rejects_non_boolean_active() {
        let result = serde_json::from_value::<ScimUserRequest>(json!({
            "userName": "x@example.com",
            "active": "maybe"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_group_request_members() {
        let request: ScimGroupRequest = serde_json::from_value(json!({
            "displayName": "Engineering",
            "members": [{"value": "1"}, {"value": 2}, {"display": "no value"}]
        }))
        .unwrap();
        let values: Vec<_> = request.members.iter().map(|m| m.value.clone()).collect();
        assert_eq!(
            values,
            vec![Some("1".to_string()), Some("2".to_string()), None]
        );

        let null_members: ScimGroupRequest =
            serde_json::from_value(json!({"displayName": "Empty", "members": null})).unwrap();
        assert!(null_members.members.is_empty());
    }

    #[rstest]
    #[case(json!("abc"), Some("abc"))]
    #[case(json!(""), None)]
    #[case(json!(42), Some("42"))]
    #[case(json!(["only"]), Some("only"))]
    #[case(json!(["a", "b"]), None)]
    #[case(json!(null), None)]
    #[case(json!({"value": "x"}), None)]
    fn test_scalar_string(#[case] value: Value, #[case] expected: Option<&str>) {
        assert_eq!(scalar_string(&value).as_deref(), expected);
    }

    #[rstest]
    #[case(json!(true), Some(true))]
    #[case(json!("TRUE"), Some(true))]
    #[case(json!("false"), Some(false))]
    #[case(json!([false]), Some(false))]
    #[case(json!("yes"), None)]
    #[case(json!(1), None)]
    fn test_scalar_bool(#[case] value: Value, #[case] expected: Option<bool>) {
        assert_eq!(scalar_bool(&value), expected);
    }

    #[test]
    fn test_name_joined() {
        let name = ScimName {
            given_name: Some("A".to_string()),
            family_name: Some("B".to_string()),
            formatted: None,
        };
        assert_eq!(name.joined().as_deref(), Some("A B"));

        let given_only = ScimName {
            given_name: Some("Cher".to_string()),
            ..Default::default()
        };
        assert_eq!(given_only.joined().as_deref(), Some("Cher"));
        assert_eq!(ScimName::default().joined(), None);
    }

    #[rstest]
    #[case(None, None, 1, 100)]
    #[case(Some("0"), Some("0"), 1, 1)]
    #[case(Some("-5"), Some("5000"), 1, 1000)]
    #[case(Some("11"), Some("10"), 11, 10)]
    #[case(Some("abc"), Some(""), 1, 100)]
    fn test_list_params_resolve(
        #[case] start_index: Option<&str>,
        #[case] count: Option<&str>,
        #[case] expected_start: i64,
        #[case] expected_count: i64,
    ) {
        let params = ScimListParams {
            filter: None,
            start_index: start_index.map(String::from),
            count: count.map(String::from),
        };
        assert_eq!(params.resolve(100, 1000), (expected_start, expected_count));
    }

    #[test]
    fn test_list_response_shape() {
        let response = ScimListResponse::new(vec![json!({"id": "1"}), json!({"id": "2"})], 25, 11);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["schemas"][0], SCHEMA_LIST_RESPONSE);
        assert_eq!(json["totalResults"], 25);
        assert_eq!(json["itemsPerPage"], 2);
        assert_eq!(json["startIndex"], 11);
        assert_eq!(json["Resources"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_service_provider_config() {
        let json = serde_json::to_value(ServiceProviderConfig::new(1000)).unwrap();
        assert_eq!(json["patch"]["supported"], true);
        assert_eq!(json["filter"]["supported"], true);
        assert_eq!(json["filter"]["maxResults"], 1000);
        assert_eq!(json["bulk"]["supported"], false);
        assert_eq!(json["changePassword"]["supported"], false);
        assert_eq!(json["sort"]["supported"], false);
        assert_eq!(json["etag"]["supported"], false);
        assert_eq!(json["authenticationSchemes"][0]["type"], "oauthbearertoken");
    }

    #[test]
    fn test_resource_types_and_schemas() {
        let base = "https://example.com/scim/v2";

        let user_type = ResourceType::user(base);
        assert_eq!(user_type.endpoint, "/Users");
        assert_eq!(user_type.meta.location, format!("{base}/ResourceTypes/User"));

        let group_schema = serde_json::to_value(ScimSchema::group(base)).unwrap();
        assert_eq!(group_schema["id"], SCHEMA_GROUP);
        let members = group_schema["attributes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["name"] == "members")
            .unwrap();
        assert_eq!(members["multiValued"], true);
        assert_eq!(members["subAttributes"][1]["name"], "$ref");
    }
}
