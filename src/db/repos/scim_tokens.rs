use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    db::error::DbResult,
    models::{CreateScimToken, ScimToken},
};

#[async_trait]
pub trait ScimTokenRepo: Send + Sync {
    /// Store a new token. Only the hash and display prefix are persisted.
    async fn create(
        &self,
        input: CreateScimToken,
        token_hash: &str,
        token_prefix: &str,
    ) -> DbResult<ScimToken>;

    /// Look up a token by the SHA-256 hash of its clear value.
    async fn get_by_hash(&self, token_hash: &str) -> DbResult<Option<ScimToken>>;

    async fn list_by_org(&self, org_id: i64) -> DbResult<Vec<ScimToken>>;

    /// Record that the token authenticated a request.
    async fn touch_last_used(&self, id: i64, at: DateTime<Utc>) -> DbResult<()>;
}
