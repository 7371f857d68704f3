//! Admin token initialization.

use anyhow::{Result, anyhow, bail};
use podium_core::config::AdminConfig;
use podium_core::token::TokenScope;
use podium_metadata::MetadataStore;
use podium_metadata::models::TokenRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Ensure the configured admin token exists, rotating the previous one if needed.
///
/// When the configured hash changes between restarts the previous admin token
/// is revoked and a new one is created with the new hash.
pub async fn ensure_admin_token(metadata: &dyn MetadataStore, config: &AdminConfig) -> Result<()> {
    let hash = config.normalized_hash().map_err(|e| anyhow!(e))?;

    if let Some(existing) = metadata.get_token_by_hash(&hash).await? {
        if existing.revoked_at.is_some() {
            bail!(
                "admin token hash matches a revoked token (id={}); use a new token hash",
                existing.token_id
            );
        }
        let now = OffsetDateTime::now_utc();
        if let Some(expires_at) = existing.expires_at
            && expires_at <= now
        {
            bail!(
                "admin token hash matches an expired token (id={}, expired={}); \
                 use a new token hash",
                existing.token_id,
                expires_at
            );
        }
        metadata.set_admin_token_id(existing.token_id).await?;
        tracing::debug!("Admin token already exists");
        return Ok(());
    }

    let now = OffsetDateTime::now_utc();
    if let Some(prev_id) = metadata.get_admin_token_id().await? {
        metadata.revoke_token(prev_id, now).await?;
        tracing::info!(token_id = %prev_id, "Previous admin token revoked");
    }

    let token = TokenRow {
        token_id: Uuid::new_v4(),
        token_hash: hash,
        scopes: serde_json::to_string(&[TokenScope::ConferenceAdmin.as_str()])?,
        expires_at: None,
        revoked_at: None,
        created_at: now,
        last_used_at: None,
        description: config.token_description.clone(),
    };

    metadata.create_token(&token).await?;
    metadata.set_admin_token_id(token.token_id).await?;
    tracing::info!(token_id = %token.token_id, "Admin token created");

    Ok(())
}
