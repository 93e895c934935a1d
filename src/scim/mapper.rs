//! Conversion between stored entities and SCIM resources.
//!
//! Outbound mapping is pure: group members are fetched by the caller and
//! passed in. Inbound mapping turns leniently-parsed request bodies into the
//! model inputs the repositories accept.

use super::{
    patch::GroupPatch,
    types::{
        SCHEMA_GROUP, SCHEMA_USER, ScimEmail, ScimGroup, ScimGroupMember, ScimGroupRequest,
        ScimMemberRef, ScimMeta, ScimName, ScimUser, ScimUserRequest,
    },
};
use crate::models::{
    CreateGroup, CreateUser, Group, GroupMember, MembershipChange, UpdateGroup, UpdateUser, User,
};

/// Inbound body problems detected while mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("'{0}' is required")]
    MissingAttribute(&'static str),

    #[error("Too many members in one request: {count} exceeds the limit of {limit}")]
    TooManyMembers { count: usize, limit: usize },
}

// =============================================================================
// Outbound
// =============================================================================

pub fn user_location(base_url: &str, id: i64) -> String {
    format!("{base_url}/Users/{id}")
}

pub fn group_location(base_url: &str, id: i64) -> String {
    format!("{base_url}/Groups/{id}")
}

pub fn user_to_resource(user: &User, base_url: &str) -> ScimUser {
    let name = ScimName {
        given_name: user.given_name.clone(),
        family_name: user.family_name.clone(),
        formatted: None,
    };

    ScimUser {
        schemas: vec![SCHEMA_USER.to_string()],
        id: user.id.to_string(),
        external_id: user.external_id.clone().filter(|s| !s.is_empty()),
        user_name: user.email.clone(),
        name: (!name.is_empty()).then_some(name),
        display_name: user
            .display_name
            .clone()
            .unwrap_or_else(|| user.email.clone()),
        emails: vec![ScimEmail::work_primary(&user.email)],
        active: user.active,
        meta: ScimMeta::user(user.created_at, user.updated_at)
            .with_location(user_location(base_url, user.id)),
    }
}

/// Map a group. `members` is `None` for list views, which never carry
/// membership.
pub fn group_to_resource(
    group: &Group,
    members: Option<&[GroupMember]>,
    base_url: &str,
) -> ScimGroup {
    ScimGroup {
        schemas: vec![SCHEMA_GROUP.to_string()],
        id: group.id.to_string(),
        external_id: group.external_id.clone().filter(|s| !s.is_empty()),
        display_name: group.display_name.clone(),
        members: members.map(|members| {
            members
                .iter()
                .map(|m| ScimGroupMember {
                    value: m.user_id.to_string(),
                    ref_uri: user_location(base_url, m.user_id),
                    display: m.display().to_string(),
                })
                .collect()
        }),
        meta: ScimMeta::group(group.created_at, group.updated_at)
            .with_location(group_location(base_url, group.id)),
    }
}

// =============================================================================
// Inbound
// =============================================================================

/// `displayName` if given, else `"givenName familyName"`, else absent.
fn derive_display_name(request: &ScimUserRequest) -> Option<String> {
    request
        .display_name
        .clone()
        .or_else(|| request.name.as_ref().and_then(ScimName::joined))
}

fn name_parts(request: &ScimUserRequest) -> (Option<String>, Option<String>) {
    request
        .name
        .as_ref()
        .map(|n| (n.given_name.clone(), n.family_name.clone()))
        .unwrap_or_default()
}

pub fn create_user_from_request(request: ScimUserRequest) -> Result<CreateUser, MappingError> {
    let display_name = derive_display_name(&request);
    let (given_name, family_name) = name_parts(&request);
    let email = request
        .user_name
        .ok_or(MappingError::MissingAttribute("userName"))?;

    Ok(CreateUser {
        external_id: request.external_id,
        email,
        display_name,
        given_name,
        family_name,
        active: request.active.unwrap_or(true),
    })
}

/// PUT semantics: every mutable scalar is overwritten. `active` is left
/// unchanged when the body omits it.
pub fn replace_user_from_request(request: ScimUserRequest) -> Result<UpdateUser, MappingError> {
    let display_name = derive_display_name(&request);
    let (given_name, family_name) = name_parts(&request);
    let email = request
        .user_name
        .ok_or(MappingError::MissingAttribute("userName"))?;

    Ok(UpdateUser {
        email: Some(email),
        display_name: Some(display_name),
        external_id: Some(request.external_id),
        given_name: Some(given_name),
        family_name: Some(family_name),
        active: request.active,
    })
}

/// Parse member references into user ids. Every reference counts towards
/// the cap; ids that are not integers are skipped.
pub fn member_ids(members: &[ScimMemberRef], limit: usize) -> Result<Vec<i64>, MappingError> {
    if members.len() > limit {
        return Err(MappingError::TooManyMembers {
            count: members.len(),
            limit,
        });
    }

    Ok(members
        .iter()
        .filter_map(|m| m.value.as_deref())
        .filter_map(|v| v.trim().parse().ok())
        .collect())
}

pub fn create_group_from_request(
    request: ScimGroupRequest,
    max_members: usize,
) -> Result<CreateGroup, MappingError> {
    let member_ids = member_ids(&request.members, max_members)?;
    let display_name = request
        .display_name
        .ok_or(MappingError::MissingAttribute("displayName"))?;

    Ok(CreateGroup {
        external_id: request.external_id,
        display_name,
        description: None,
        member_ids,
    })
}

/// PUT semantics for groups: scalars overwritten and membership replaced
/// wholesale. A body without `members` empties the group.
pub fn replace_group_from_request(
    request: ScimGroupRequest,
    max_members: usize,
) -> Result<GroupPatch, MappingError> {
    let member_ids = member_ids(&request.members, max_members)?;
    let display_name = request
        .display_name
        .ok_or(MappingError::MissingAttribute("displayName"))?;

    Ok(GroupPatch {
        update: UpdateGroup {
            display_name: Some(display_name),
            external_id: Some(request.external_id),
            description: None,
        },
        membership: vec![MembershipChange::Replace(member_ids)],
    })
}
