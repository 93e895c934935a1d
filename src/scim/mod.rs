//! SCIM 2.0 Protocol Implementation
//!
//! Types and pure logic for the SCIM provisioning surface. Identity providers
//! such as Okta, Azure AD, Keycloak and OneLogin use it to create, update and
//! deactivate users and groups.
//!
//! ## RFC References
//!
//! - RFC 7643: SCIM Core Schema
//! - RFC 7644: SCIM Protocol
//!
//! ## Module Structure
//!
//! - [`types`]: SCIM resources, request bodies and discovery documents
//! - [`error`]: SCIM error envelope
//! - [`filter`]: `attr eq "value"` filter parser
//! - [`filter_to_sql`]: filter translation for the repositories
//! - [`patch`]: PATCH request parser and change planner
//! - [`mapper`]: entity ↔ resource conversion

pub mod error;
pub mod filter;
pub mod filter_to_sql;
pub mod mapper;
pub mod patch;
pub mod types;

pub use error::*;
pub use filter::{CompareOp, Filter, parse_filter, parse_member_path};
pub use filter_to_sql::{ScimResourceType, SqlFilter, filter_to_sql};
pub use mapper::MappingError;
pub use patch::{GroupPatch, PatchError, PatchRequest, plan_group_patch, plan_user_patch};
pub use types::*;
