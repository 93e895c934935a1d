use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Role a user holds within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    #[default]
    Member,
    /// Owner of a personal group
    Admin,
}

impl MembershipRole {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub org_id: i64,
    pub external_id: Option<String>,
    pub display_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroup {
    #[validate(length(min = 1, max = 255))]
    pub external_id: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub display_name: String,
    pub description: Option<String>,
    /// Initial members. Ids outside the organization are skipped.
    #[serde(default)]
    pub member_ids: Vec<i64>,
}

/// Column-level changes to a group. See [`crate::models::UpdateUser`] for the
/// meaning of the nested options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct UpdateGroup {
    #[validate(length(min = 1, max = 255))]
    pub display_name: Option<String>,
    pub external_id: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

/// One step of membership reconciliation. Steps apply in order inside the
/// transaction that updates the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    /// Add the user if not already a member.
    Ensure(i64),
    /// Remove the user if present.
    Remove(i64),
    /// Remove every member.
    RemoveAll,
    /// Make the member set exactly these. Members who stay keep their role.
    Replace(Vec<i64>),
}

/// A membership joined with the member's identity, as rendered in
/// `Group.members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMember {
    pub user_id: i64,
    pub email: String,
    pub display_name: Option<String>,
    pub role: MembershipRole,
}

impl GroupMember {
    /// Name shown in the `display` sub-attribute.
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Rows removed alongside a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupDeletion {
    pub memberships: u64,
    pub links: u64,
}
