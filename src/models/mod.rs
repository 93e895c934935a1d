mod group;
mod organization;
mod scim_token;
mod user;

pub use group::*;
pub use organization::*;
pub use scim_token::*;
pub use user::*;
