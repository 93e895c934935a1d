mod organizations;
mod scim_provisioning;
mod scim_tokens;

use std::sync::Arc;

pub use organizations::OrganizationService;
pub use scim_provisioning::{ProvisioningResult, ScimProvisioningError, ScimProvisioningService};
pub use scim_tokens::{
    ScimAuth, ScimTokenError, ScimTokenService, TOKEN_LEN, TOKEN_PREFIX_LEN, generate_token,
    hash_token,
};
use tokio_util::task::TaskTracker;

use crate::{config::AppConfig, db::DbPool};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub organizations: OrganizationService,
    pub scim_tokens: ScimTokenService,
    pub scim_provisioning: ScimProvisioningService,
}

impl Services {
    pub fn new(db: Arc<DbPool>, config: &AppConfig, task_tracker: TaskTracker) -> Self {
        Self {
            organizations: OrganizationService::new(db.clone()),
            scim_tokens: ScimTokenService::new(db.clone(), task_tracker),
            scim_provisioning: ScimProvisioningService::new(
                db,
                config.scim_base_url(),
                &config.scim,
            ),
        }
    }
}
