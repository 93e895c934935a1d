//! Service layer for SCIM bearer tokens.
//!
//! Minting, listing and authenticating the organization-scoped tokens that
//! identity providers present on every SCIM request.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio_util::task::TaskTracker;

use crate::{
    db::{DbError, DbPool, DbResult},
    models::{CreateScimToken, CreatedScimToken, ScimToken},
};

/// Length of a clear token: 32 random bytes, hex-encoded.
pub const TOKEN_LEN: usize = 64;

/// Number of leading characters kept for display.
pub const TOKEN_PREFIX_LEN: usize = 8;

/// The organization a request is acting for, resolved from its bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScimAuth {
    pub org_id: i64,
    pub token_id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ScimTokenError {
    #[error("Token is malformed")]
    Malformed,

    #[error("Token is not recognized")]
    Unknown,

    #[error("Token expired")]
    Expired,

    #[error("Organization {0} not found")]
    OrganizationNotFound(i64),

    #[error("Invalid token request: {0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

#[derive(Clone)]
pub struct ScimTokenService {
    db: Arc<DbPool>,
    task_tracker: TaskTracker,
}

impl ScimTokenService {
    pub fn new(db: Arc<DbPool>, task_tracker: TaskTracker) -> Self {
        Self { db, task_tracker }
    }

    /// Mint a token for an organization. The clear value is returned here
    /// and nowhere else.
    pub async fn create(
        &self,
        org_id: i64,
        description: Option<String>,
        expires_in_days: Option<i64>,
    ) -> Result<CreatedScimToken, ScimTokenError> {
        if self.db.organizations().get_by_id(org_id).await?.is_none() {
            return Err(ScimTokenError::OrganizationNotFound(org_id));
        }

        let expires_at = match expires_in_days {
            Some(days) if days <= 0 => {
                return Err(ScimTokenError::Validation(
                    "expires_in_days must be positive".to_string(),
                ));
            }
            Some(days) => Some(Utc::now() + Duration::days(days)),
            None => None,
        };

        let input = CreateScimToken {
            org_id,
            description,
            expires_at,
        };
        validator::Validate::validate(&input)
            .map_err(|e| ScimTokenError::Validation(e.to_string()))?;

        let (token, token_hash, token_prefix) = generate_token();
        let record = self
            .db
            .scim_tokens()
            .create(input, &token_hash, &token_prefix)
            .await?;

        tracing::info!(
            org_id,
            token_id = record.id,
            prefix = %record.token_prefix,
            "Created SCIM token"
        );

        Ok(CreatedScimToken { token, record })
    }

    pub async fn list(&self, org_id: i64) -> DbResult<Vec<ScimToken>> {
        self.db.scim_tokens().list_by_org(org_id).await
    }

    /// Resolve a bearer token to the organization it belongs to.
    ///
    /// On success the token's `last_used_at` is refreshed in the background;
    /// the request never waits on that write.
    pub async fn authenticate(&self, token: &str) -> Result<ScimAuth, ScimTokenError> {
        if !is_well_formed(token) {
            return Err(ScimTokenError::Malformed);
        }

        let record = self
            .db
            .scim_tokens()
            .get_by_hash(&hash_token(token))
            .await?
            .ok_or(ScimTokenError::Unknown)?;

        let now = Utc::now();
        if record.is_expired(now) {
            return Err(ScimTokenError::Expired);
        }

        let repo = self.db.scim_tokens();
        let token_id = record.id;
        self.task_tracker.spawn(async move {
            if let Err(e) = repo.touch_last_used(token_id, now).await {
                tracing::warn!(token_id, error = %e, "Failed to update SCIM token last_used_at");
            }
        });

        Ok(ScimAuth {
            org_id: record.org_id,
            token_id,
        })
    }
}

/// Generate a new SCIM bearer token.
///
/// Returns (raw_token, token_hash, token_prefix).
pub fn generate_token() -> (String, String, String) {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);

    let raw_token = hex::encode(bytes);
    let token_hash = hash_token(&raw_token);
    let token_prefix = raw_token[..TOKEN_PREFIX_LEN].to_string();

    (raw_token, token_hash, token_prefix)
}

/// Hash a token using SHA-256, hex-encoded.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.bytes().all(|b| b.is_ascii_hexdigit())
}
