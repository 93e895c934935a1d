//! Bearer tokens that identity providers present to the SCIM endpoint.
//!
//! Only a SHA-256 hash and an 8-character display prefix are stored; the clear
//! value is returned once, at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScimToken {
    pub id: i64,
    /// Owning organization; fixed for the lifetime of the token
    pub org_id: i64,
    /// First 8 characters of the clear token, for identification in listings
    pub token_prefix: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ScimToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateScimToken {
    pub org_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A freshly minted token. `token` is the only copy of the clear value.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedScimToken {
    pub token: String,
    #[serde(flatten)]
    pub record: ScimToken,
}
