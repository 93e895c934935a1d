//! SCIM 2.0 PATCH Operations
//!
//! Parses PatchOp request bodies (RFC 7644 Section 3.5.2) and folds the
//! operation list into a change plan. Planning is pure: nothing here touches
//! the database. The repositories apply a plan inside one transaction.
//!
//! ## Supported paths
//!
//! | Resource | Path                         | add / replace        | remove          |
//! |----------|------------------------------|----------------------|-----------------|
//! | User     | `active`                     | set flag             | ignored         |
//! | User     | `userName`                   | rename email         | ignored         |
//! | User     | `displayName`                | set                  | ignored         |
//! | User     | `externalId`                 | set                  | clear           |
//! | User     | `name.givenName`             | set                  | clear           |
//! | User     | `name.familyName`            | set                  | clear           |
//! | User     | `name`                       | merge sub-fields     | ignored         |
//! | Group    | `displayName`, `externalId`  | set                  | clear externalId|
//! | Group    | `members`                    | ensure / replace all | remove          |
//! | Group    | `members[value eq "<id>"]`   | ignored              | remove one      |
//! | both     | absent or `""`               | merge object value   | ignored         |
//!
//! Anything else is ignored. Paths compare case-insensitively and may carry
//! the core schema URN as a prefix.
//!
//! ## Example
//!
//! ```json
//! {
//!   "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
//!   "Operations": [
//!     { "op": "replace", "path": "active", "value": false },
//!     { "op": "Add", "path": "members", "value": [{"value": "42"}] },
//!     { "op": "remove", "path": "members[value eq \"7\"]" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::{
    filter::parse_member_path,
    types::{SCHEMA_GROUP, SCHEMA_USER},
};
use crate::models::{MembershipChange, UpdateGroup, UpdateUser};

/// PATCH operation kind. Parsed case-insensitively (Azure AD sends `"Add"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

impl PatchOpKind {
    pub fn parse(op: &str) -> Option<Self> {
        match op.trim().to_ascii_lowercase().as_str() {
            "add" => Some(Self::Add),
            "replace" => Some(Self::Replace),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }
}

/// Untyped PATCH value.
///
/// Numbers become strings and `null` is dropped, so a `null` value behaves
/// the same as an absent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchValue {
    Bool(bool),
    String(String),
    Object(BTreeMap<String, PatchValue>),
    List(Vec<PatchValue>),
}

impl PatchValue {
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(b)),
            Value::Number(n) => Some(Self::String(n.to_string())),
            Value::String(s) => Some(Self::String(s)),
            Value::Array(items) => Some(Self::List(
                items.into_iter().filter_map(Self::from_json).collect(),
            )),
            Value::Object(map) => Some(Self::Object(
                map.into_iter()
                    .filter_map(|(k, v)| Self::from_json(v).map(|v| (k, v)))
                    .collect(),
            )),
        }
    }

    /// String content. A one-element list is unwrapped.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::List(items) if items.len() == 1 => items[0].as_str(),
            _ => None,
        }
    }

    /// Boolean content, accepting `"true"`/`"false"` in any case.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Self::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            Self::List(items) if items.len() == 1 => items[0].as_bool(),
            _ => None,
        }
    }

    /// Object content. A one-element list is unwrapped.
    pub fn as_object(&self) -> Option<&BTreeMap<String, PatchValue>> {
        match self {
            Self::Object(map) => Some(map),
            Self::List(items) if items.len() == 1 => items[0].as_object(),
            _ => None,
        }
    }

    /// The value viewed as a list; a scalar or object is a list of one.
    fn as_list(&self) -> &[PatchValue] {
        match self {
            Self::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }
}

/// Case-insensitive key lookup in an object value.
fn get_ci<'a>(map: &'a BTreeMap<String, PatchValue>, key: &str) -> Option<&'a PatchValue> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// A single PATCH operation after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOp {
    pub op: PatchOpKind,
    pub path: Option<String>,
    pub value: Option<PatchValue>,
}

/// A parsed PatchOp request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRequest {
    pub operations: Vec<PatchOp>,
}

#[derive(Deserialize)]
struct RawPatchRequest {
    #[serde(rename = "Operations", alias = "operations")]
    operations: Vec<RawPatchOp>,
}

#[derive(Deserialize)]
struct RawPatchOp {
    op: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

/// PATCH request errors. All of them are raised before any change is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("Invalid PATCH request body: {0}")]
    Malformed(String),

    #[error("PATCH request contains no operations")]
    Empty,

    #[error("Unsupported PATCH op '{0}'")]
    UnknownOp(String),

    #[error("Too many members in one request: {count} exceeds the limit of {limit}")]
    TooManyMembers { count: usize, limit: usize },
}

impl PatchRequest {
    /// Parse a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, PatchError> {
        let raw: RawPatchRequest =
            serde_json::from_slice(body).map_err(|e| PatchError::Malformed(e.to_string()))?;

        if raw.operations.is_empty() {
            return Err(PatchError::Empty);
        }

        let operations = raw
            .operations
            .into_iter()
            .map(|raw_op| {
                let op = PatchOpKind::parse(&raw_op.op)
                    .ok_or_else(|| PatchError::UnknownOp(raw_op.op.clone()))?;
                Ok(PatchOp {
                    op,
                    path: raw_op.path,
                    value: raw_op.value.and_then(PatchValue::from_json),
                })
            })
            .collect::<Result<Vec<_>, PatchError>>()?;

        Ok(Self { operations })
    }
}

/// Lowercase a path and strip a leading core schema URN
/// (`urn:...:core:2.0:User:userName` → `username`).
fn normalize_path(path: Option<&str>, schema: &str) -> String {
    let path = path.unwrap_or_default().trim();
    let path = match path.get(..schema.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(schema) => {
            path[schema.len()..].trim_start_matches(':')
        }
        _ => path,
    };
    path.to_ascii_lowercase()
}

/// Empty string means "clear" for optional attributes.
fn optional_string(value: &PatchValue) -> Option<Option<String>> {
    value
        .as_str()
        .map(|s| (!s.is_empty()).then(|| s.to_string()))
}

// =============================================================================
// User planning
// =============================================================================

/// Fold a PATCH request into a single user update. Later operations win.
pub fn plan_user_patch(request: &PatchRequest) -> UpdateUser {
    let mut update = UpdateUser::default();
    for op in &request.operations {
        let path = normalize_path(op.path.as_deref(), SCHEMA_USER);
        apply_user_op(&mut update, op.op, &path, op.value.as_ref());
    }
    update
}

fn apply_user_op(
    update: &mut UpdateUser,
    op: PatchOpKind,
    path: &str,
    value: Option<&PatchValue>,
) {
    if op == PatchOpKind::Remove {
        match path {
            "externalid" => update.external_id = Some(None),
            "name.givenname" => update.given_name = Some(None),
            "name.familyname" => update.family_name = Some(None),
            _ => tracing::debug!(path, "Ignoring PATCH remove on user path"),
        }
        return;
    }

    let Some(value) = value else {
        tracing::debug!(path, "Ignoring PATCH operation without value");
        return;
    };

    match path {
        "" => {
            if let Some(map) = value.as_object() {
                for (key, inner) in map {
                    apply_user_op(update, op, &key.to_ascii_lowercase(), Some(inner));
                }
            }
        }
        "active" => {
            if let Some(active) = value.as_bool() {
                update.active = Some(active);
            }
        }
        "username" => {
            if let Some(email) = value.as_str().filter(|s| !s.is_empty()) {
                update.email = Some(email.to_string());
            }
        }
        "displayname" => {
            if let Some(display_name) = optional_string(value) {
                update.display_name = Some(display_name);
            }
        }
        "externalid" => {
            if let Some(external_id) = optional_string(value) {
                update.external_id = Some(external_id);
            }
        }
        "name.givenname" => {
            if let Some(given_name) = optional_string(value) {
                update.given_name = Some(given_name);
            }
        }
        "name.familyname" => {
            if let Some(family_name) = optional_string(value) {
                update.family_name = Some(family_name);
            }
        }
        "name" => {
            if let Some(name) = value.as_object() {
                if let Some(given_name) = get_ci(name, "givenName").and_then(optional_string) {
                    update.given_name = Some(given_name);
                }
                if let Some(family_name) = get_ci(name, "familyName").and_then(optional_string) {
                    update.family_name = Some(family_name);
                }
            }
        }
        _ => tracing::debug!(path, "Ignoring unsupported user PATCH path"),
    }
}

// =============================================================================
// Group planning
// =============================================================================

/// Planned changes to a group: scalar updates plus ordered membership edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPatch {
    pub update: UpdateGroup,
    pub membership: Vec<MembershipChange>,
}

/// Fold a PATCH request into a group change plan.
///
/// `max_members` caps the number of member references across the request.
pub fn plan_group_patch(
    request: &PatchRequest,
    max_members: usize,
) -> Result<GroupPatch, PatchError> {
    let mut plan = GroupPatch::default();
    let mut member_refs = 0usize;

    for op in &request.operations {
        let path = normalize_path(op.path.as_deref(), SCHEMA_GROUP);
        apply_group_op(&mut plan, &mut member_refs, op.op, &path, op.value.as_ref());
    }

    if member_refs > max_members {
        return Err(PatchError::TooManyMembers {
            count: member_refs,
            limit: max_members,
        });
    }
    Ok(plan)
}

fn apply_group_op(
    plan: &mut GroupPatch,
    member_refs: &mut usize,
    op: PatchOpKind,
    path: &str,
    value: Option<&PatchValue>,
) {
    if path.starts_with("members[") {
        match (op, parse_member_path(path).and_then(|id| parse_user_id(&id))) {
            (PatchOpKind::Remove, Some(user_id)) => {
                *member_refs += 1;
                plan.membership.push(MembershipChange::Remove(user_id));
            }
            _ => tracing::debug!(path, "Ignoring PATCH on filtered members path"),
        }
        return;
    }

    match (op, path) {
        (PatchOpKind::Remove, "externalid") => plan.update.external_id = Some(None),
        (PatchOpKind::Remove, "members") => match value {
            Some(value) => {
                let ids = member_ids(value, member_refs);
                plan.membership
                    .extend(ids.into_iter().map(MembershipChange::Remove));
            }
            None => plan.membership.push(MembershipChange::RemoveAll),
        },
        (PatchOpKind::Remove, _) => tracing::debug!(path, "Ignoring PATCH remove on group path"),
        (_, "members") => {
            let Some(value) = value else {
                return;
            };
            let ids = member_ids(value, member_refs);
            if op == PatchOpKind::Replace {
                plan.membership.push(MembershipChange::Replace(ids));
            } else {
                plan.membership
                    .extend(ids.into_iter().map(MembershipChange::Ensure));
            }
        }
        (_, "displayname") => {
            if let Some(name) = value.and_then(PatchValue::as_str).filter(|s| !s.is_empty()) {
                plan.update.display_name = Some(name.to_string());
            }
        }
        (_, "externalid") => {
            if let Some(external_id) = value.and_then(optional_string) {
                plan.update.external_id = Some(external_id);
            }
        }
        (_, "") => {
            let Some(map) = value.and_then(PatchValue::as_object) else {
                return;
            };
            for (key, inner) in map {
                let key = key.to_ascii_lowercase();
                // Members inside a path-less value are always additive.
                let op = if key == "members" { PatchOpKind::Add } else { op };
                apply_group_op(plan, member_refs, op, &key, Some(inner));
            }
        }
        _ => tracing::debug!(path, "Ignoring unsupported group PATCH path"),
    }
}

fn parse_user_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Collect user ids from a members value. Accepts `[{"value": "1"}]`, a
/// single object, or bare strings. Every entry counts towards the cap;
/// entries that do not parse are skipped.
fn member_ids(value: &PatchValue, member_refs: &mut usize) -> Vec<i64> {
    let entries = value.as_list();
    *member_refs += entries.len();

    entries
        .iter()
        .filter_map(|entry| match entry {
            PatchValue::Object(map) => get_ci(map, "value").and_then(PatchValue::as_str),
            other => other.as_str(),
        })
        .filter_map(|raw| {
            let id = parse_user_id(raw);
            if id.is_none() {
                tracing::debug!(member = raw, "Skipping member id that is not a user id");
            }
            id
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn request(body: Value) -> PatchRequest {
        PatchRequest::from_slice(body.to_string().as_bytes()).unwrap()
    }

    fn ops(operations: Value) -> PatchRequest {
        request(json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
            "Operations": operations
        }))
    }

    #[test]
    fn test_parse_accepts_mixed_case_ops_without_schemas() {
        let req = request(json!({
            "Operations": [
                {"op": "Replace", "path": "active", "value": "False"},
                {"op": "ADD", "path": "displayName", "value": "X"},
                {"op": "remove", "path": "externalId"}
            ]
        }));
        let kinds: Vec<_> = req.operations.iter().map(|o| o.op).collect();
        assert_eq!(
            kinds,
            vec![PatchOpKind::Replace, PatchOpKind::Add, PatchOpKind::Remove]
        );
    }

    #[rstest]
    #[case(b"not json".as_slice())]
    #[case(br#"{"schemas": []}"#.as_slice())]
    #[case(br#"{"Operations": "replace"}"#.as_slice())]
    fn test_parse_malformed(#[case] body: &[u8]) {
        assert!(matches!(
            PatchRequest::from_slice(body),
            Err(PatchError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_empty_and_unknown_op() {
        assert_eq!(
            PatchRequest::from_slice(br#"{"Operations": []}"#),
            Err(PatchError::Empty)
        );
        assert_eq!(
            PatchRequest::from_slice(br#"{"Operations": [{"op": "move", "path": "x"}]}"#),
            Err(PatchError::UnknownOp("move".to_string()))
        );
    }

    #[test]
    fn test_patch_value_conversion() {
        let value = PatchValue::from_json(json!({"a": 1, "b": null, "c": [true, null]})).unwrap();
        let PatchValue::Object(map) = value else {
            panic!("expected object");
        };
        assert_eq!(map.get("a"), Some(&PatchValue::String("1".to_string())));
        assert!(!map.contains_key("b"));
        assert_eq!(map.get("c"), Some(&PatchValue::List(vec![PatchValue::Bool(true)])));
        assert_eq!(PatchValue::from_json(Value::Null), None);
    }

    #[test]
    fn test_user_replace_active() {
        let update = plan_user_patch(&ops(json!([
            {"op": "replace", "path": "active", "value": false}
        ])));
        assert_eq!(update.active, Some(false));
        assert_eq!(
            UpdateUser {
                active: None,
                ..update
            },
            UpdateUser::default()
        );
    }

    #[rstest]
    #[case(json!("false"))]
    #[case(json!("False"))]
    #[case(json!([false]))]
    fn test_user_active_tolerates_idp_encodings(#[case] value: Value) {
        let update = plan_user_patch(&ops(json!([
            {"op": "Replace", "path": "active", "value": value}
        ])));
        assert_eq!(update.active, Some(false));
    }

    #[test]
    fn test_user_add_behaves_like_replace() {
        let update = plan_user_patch(&ops(json!([
            {"op": "add", "path": "userName", "value": "new@example.com"},
            {"op": "add", "path": "displayName", "value": "New Name"},
            {"op": "add", "path": "name.givenName", "value": "New"},
            {"op": "add", "path": "externalId", "value": "ext-9"}
        ])));
        assert_eq!(update.email.as_deref(), Some("new@example.com"));
        assert_eq!(update.display_name, Some(Some("New Name".to_string())));
        assert_eq!(update.given_name, Some(Some("New".to_string())));
        assert_eq!(update.external_id, Some(Some("ext-9".to_string())));
    }

    #[test]
    fn test_user_remove_clears_only_optional_fields() {
        let update = plan_user_patch(&ops(json!([
            {"op": "remove", "path": "externalId"},
            {"op": "remove", "path": "name.givenName"},
            {"op": "remove", "path": "name.familyName"},
            {"op": "remove", "path": "active"},
            {"op": "remove", "path": "userName"},
            {"op": "remove", "path": "displayName"}
        ])));
        assert_eq!(update.external_id, Some(None));
        assert_eq!(update.given_name, Some(None));
        assert_eq!(update.family_name, Some(None));
        assert_eq!(update.active, None);
        assert_eq!(update.email, None);
        assert_eq!(update.display_name, None);
    }

    #[test]
    fn test_user_pathless_merge() {
        let update = plan_user_patch(&ops(json!([
            {"op": "replace", "value": {
                "active": "true",
                "displayName": "Merged",
                "name": {"givenName": "M", "familyName": "G"},
                "phoneNumbers": [{"value": "555"}]
            }}
        ])));
        assert_eq!(update.active, Some(true));
        assert_eq!(update.display_name, Some(Some("Merged".to_string())));
        assert_eq!(update.given_name, Some(Some("M".to_string())));
        assert_eq!(update.family_name, Some(Some("G".to_string())));
    }

    #[test]
    fn test_user_schema_prefixed_path_and_last_write_wins() {
        let update = plan_user_patch(&ops(json!([
            {"op": "replace", "path": "urn:ietf:params:scim:schemas:core:2.0:User:active", "value": false},
            {"op": "replace", "path": "ACTIVE", "value": true}
        ])));
        assert_eq!(update.active, Some(true));
    }

    #[test]
    fn test_user_unknown_paths_ignored() {
        let update = plan_user_patch(&ops(json!([
            {"op": "replace", "path": "emails[type eq \"work\"].value", "value": "x@example.com"},
            {"op": "replace", "path": "title", "value": "CTO"},
            {"op": "replace", "path": "active", "value": "maybe"}
        ])));
        assert!(update.is_empty());
    }

    #[test]
    fn test_group_member_operations() {
        let plan = plan_group_patch(
            &ops(json!([
                {"op": "add", "path": "members", "value": [{"value": "1"}, {"value": "2"}]},
                {"op": "remove", "path": "members[value eq \"2\"]"},
                {"op": "replace", "path": "members", "value": [{"value": "3"}]},
                {"op": "remove", "path": "members"}
            ])),
            1000,
        )
        .unwrap();
        assert_eq!(
            plan.membership,
            vec![
                MembershipChange::Ensure(1),
                MembershipChange::Ensure(2),
                MembershipChange::Remove(2),
                MembershipChange::Replace(vec![3]),
                MembershipChange::RemoveAll,
            ]
        );
    }

    #[test]
    fn test_group_remove_members_with_value_removes_listed() {
        let plan = plan_group_patch(
            &ops(json!([
                {"op": "Remove", "path": "members", "value": [{"value": "5"}]}
            ])),
            1000,
        )
        .unwrap();
        assert_eq!(plan.membership, vec![MembershipChange::Remove(5)]);
    }

    #[test]
    fn test_group_unparseable_member_ids_skipped() {
        let plan = plan_group_patch(
            &ops(json!([
                {"op": "add", "path": "members", "value": [{"value": "abc"}, {"value": 7}, {}]}
            ])),
            1000,
        )
        .unwrap();
        assert_eq!(plan.membership, vec![MembershipChange::Ensure(7)]);
    }

    #[test]
    fn test_group_rename_and_pathless_members_are_additive() {
        let plan = plan_group_patch(
            &ops(json!([
                {"op": "replace", "path": "displayName", "value": "Renamed"},
                {"op": "replace", "value": {"externalId": "g-1", "members": [{"value": "9"}]}}
            ])),
            1000,
        )
        .unwrap();
        assert_eq!(plan.update.display_name.as_deref(), Some("Renamed"));
        assert_eq!(plan.update.external_id, Some(Some("g-1".to_string())));
        assert_eq!(plan.membership, vec![MembershipChange::Ensure(9)]);
    }

    #[test]
    fn test_group_filtered_path_ignored_for_add() {
        let plan = plan_group_patch(
            &ops(json!([
                {"op": "add", "path": "members[value eq \"2\"]", "value": "x"},
                {"op": "remove", "path": "members[display eq \"Bob\"]"}
            ])),
            1000,
        )
        .unwrap();
        assert!(plan.membership.is_empty());
    }

    #[test]
    fn test_group_member_cap() {
        let members: Vec<Value> = (1..=3).map(|i| json!({"value": i.to_string()})).collect();
        let err = plan_group_patch(
            &ops(json!([{"op": "add", "path": "members", "value": members}])),
            2,
        )
        .unwrap_err();
        assert_eq!(err, PatchError::TooManyMembers { count: 3, limit: 2 });
    }
}
