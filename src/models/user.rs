use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A provisioned identity.
///
/// `email` doubles as the SCIM `userName` and is unique across every
/// organization (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub org_id: i64,
    /// Opaque key assigned by the identity provider
    pub external_id: Option<String>,
    pub email: String,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 255))]
    pub external_id: Option<String>,
    #[validate(email, length(max = 320))]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub display_name: Option<String>,
    #[validate(length(max = 255))]
    pub given_name: Option<String>,
    #[validate(length(max = 255))]
    pub family_name: Option<String>,
    pub active: bool,
}

/// Column-level changes to a user, applied in a single statement.
///
/// `None` leaves the column untouched. For the nullable columns the inner
/// `Option` is the new value, so `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct UpdateUser {
    #[validate(email, length(max = 320))]
    pub email: Option<String>,
    pub display_name: Option<Option<String>>,
    pub external_id: Option<Option<String>>,
    pub given_name: Option<Option<String>>,
    pub family_name: Option<Option<String>>,
    pub active: Option<bool>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Rows removed alongside a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserDeletion {
    pub api_keys: u64,
    pub memberships: u64,
    pub sso_identities: u64,
    pub links: u64,
}
