mod groups;
mod memberships;
mod organizations;
mod scim_tokens;
mod users;

pub use groups::*;
pub use memberships::*;
pub use organizations::*;
pub use scim_tokens::*;
pub use users::*;

/// Offset pagination as used by SCIM list requests.
///
/// `offset` is 0-based; callers convert from SCIM's 1-based `startIndex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub offset: i64,
    pub limit: i64,
}

/// One page of a filtered listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of records matching the filter, ignoring pagination.
    pub total: i64,
}
