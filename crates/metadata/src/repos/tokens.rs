//! Token repository.

use crate::error::MetadataResult;
use crate::models::TokenRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for token operations.
#[async_trait]
pub trait TokenRepo: Send + Sync {
    /// Create a token.
    async fn create_token(&self, token: &TokenRow) -> MetadataResult<()>;

    /// Get a token by hash.
    async fn get_token_by_hash(&self, token_hash: &str) -> MetadataResult<Option<TokenRow>>;

    /// Get a token by ID.
    async fn get_token(&self, token_id: Uuid) -> MetadataResult<Option<TokenRow>>;

    /// Update last used time.
    async fn touch_token(&self, token_id: Uuid, used_at: OffsetDateTime) -> MetadataResult<()>;

    /// Revoke a token. Fails with `NotFound` for an unknown ID.
    async fn revoke_token(&self, token_id: Uuid, revoked_at: OffsetDateTime) -> MetadataResult<()>;

    /// List all tokens, newest first.
    async fn list_tokens(&self) -> MetadataResult<Vec<TokenRow>>;

    /// ID of the token created from the configured admin hash, if any.
    async fn get_admin_token_id(&self) -> MetadataResult<Option<Uuid>>;

    /// Record which token was created from the configured admin hash.
    async fn set_admin_token_id(&self, token_id: Uuid) -> MetadataResult<()>;
}
