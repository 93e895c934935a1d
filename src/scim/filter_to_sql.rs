//! SCIM Filter to SQL Translation
//!
//! Converts a parsed `attr eq "value"` filter into a parameterised `WHERE`
//! fragment for the SQLite repositories.
//!
//! ### User attributes
//!
//! - `userName` → `users.email` (column collation is `NOCASE`)
//! - `externalId` → `users.external_id`
//!
//! ### Group attributes
//!
//! - `displayName` → `user_groups.display_name`
//! - `externalId` → `user_groups.external_id`
//!
//! Any other attribute translates to `None`, which list endpoints treat as
//! "no filter".

use super::filter::{CompareOp, Filter};

/// Result of converting a SCIM filter to SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFilter {
    /// SQL WHERE clause fragment (e.g., "email = ?")
    pub where_clause: String,
    /// Bind values in order
    pub bindings: Vec<String>,
}

/// SCIM resource type for attribute mapping context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScimResourceType {
    User,
    Group,
}

fn user_column(attr: &str) -> Option<&'static str> {
    match attr.to_ascii_lowercase().as_str() {
        "username" => Some("email"),
        "externalid" => Some("external_id"),
        _ => None,
    }
}

fn group_column(attr: &str) -> Option<&'static str> {
    match attr.to_ascii_lowercase().as_str() {
        "displayname" => Some("display_name"),
        "externalid" => Some("external_id"),
        _ => None,
    }
}

/// Convert a SCIM filter to a SQL WHERE clause.
///
/// Returns `None` if the attribute is not filterable for this resource type.
pub fn filter_to_sql(filter: &Filter, resource_type: ScimResourceType) -> Option<SqlFilter> {
    let column = match resource_type {
        ScimResourceType::User => user_column(&filter.attribute),
        ScimResourceType::Group => group_column(&filter.attribute),
    }?;

    let operator = match filter.op {
        CompareOp::Eq => "=",
    };

    Some(SqlFilter {
        where_clause: format!("{column} {operator} ?"),
        bindings: vec![filter.value.clone()],
    })
}
