mod common;
mod groups;
mod memberships;
mod organizations;
mod scim_tokens;
mod users;

pub use groups::SqliteGroupRepo;
pub use memberships::SqliteMembershipRepo;
pub use organizations::SqliteOrganizationRepo;
pub use scim_tokens::SqliteScimTokenRepo;
pub use users::SqliteUserRepo;
