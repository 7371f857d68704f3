//! Administrative handlers: health, conferences and tokens.

use super::common::{format_optional_timestamp, format_timestamp, read_json};
use crate::auth::{hash_token, require_scope};
use crate::cache::schedule_cache_key;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use podium_core::Localised;
use podium_core::token::TokenScope;
use podium_metadata::models::{ConferenceRow, NewConference, TokenRow};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Token and conference bodies are small.
const MAX_ADMIN_BODY_SIZE: usize = 64 * 1024;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /v1/health - Health check.
///
/// Unauthenticated so probes and load balancers can call it. Returns only the
/// status and the server version.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.metadata.health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// Conferences
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateConferenceRequest {
    pub slug: String,
    pub title: Localised,
}

#[derive(Debug, Serialize)]
pub struct ConferenceResponse {
    pub id: i64,
    pub slug: String,
    pub title: Localised,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<ConferenceRow> for ConferenceResponse {
    type Error = ApiError;

    fn try_from(row: ConferenceRow) -> ApiResult<Self> {
        Ok(Self {
            id: row.id,
            slug: row.slug,
            title: row.title.0,
            created_at: format_timestamp(row.created_at)?,
            updated_at: format_timestamp(row.updated_at)?,
        })
    }
}

/// Slugs appear in public URLs: 3-64 chars of lowercase alphanumerics and
/// inner hyphens.
fn validate_slug(slug: &str) -> ApiResult<()> {
    if slug.len() < 3 || slug.len() > 64 {
        return Err(ApiError::BadRequest(
            "conference slug must be 3-64 characters".to_string(),
        ));
    }

    let valid = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');

    if !valid {
        return Err(ApiError::BadRequest(
            "conference slug must be lowercase alphanumeric with hyphens".to_string(),
        ));
    }

    Ok(())
}

/// POST /v1/admin/conferences
pub async fn create_conference(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<ConferenceResponse>)> {
    require_scope(&req, TokenScope::ConferenceAdmin)?;

    let body: CreateConferenceRequest = read_json(req, MAX_ADMIN_BODY_SIZE).await?;
    validate_slug(&body.slug)?;
    if body.title.is_empty() {
        return Err(ApiError::BadRequest(
            "conference title needs at least one locale".to_string(),
        ));
    }

    let row = state
        .metadata
        .create_conference(&NewConference {
            slug: body.slug,
            title: body.title,
        })
        .await?;
    tracing::info!(conference_id = row.id, slug = %row.slug, "Conference created");

    Ok((StatusCode::CREATED, Json(row.try_into()?)))
}

/// GET /v1/admin/conferences
pub async fn list_conferences(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<Vec<ConferenceResponse>>> {
    require_scope(&req, TokenScope::ConferenceRead)?;

    let conferences = state
        .metadata
        .list_conferences()
        .await?
        .into_iter()
        .map(ConferenceResponse::try_from)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(conferences))
}

/// GET /v1/admin/conferences/{conference_id}
pub async fn get_conference(
    State(state): State<AppState>,
    Path(conference_id): Path<i64>,
    req: Request,
) -> ApiResult<Json<ConferenceResponse>> {
    require_scope(&req, TokenScope::ConferenceRead)?;

    let row = state
        .metadata
        .get_conference(conference_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("conference {conference_id}")))?;

    Ok(Json(row.try_into()?))
}

/// DELETE /v1/admin/conferences/{conference_id}
///
/// Removes the conference with all of its content.
pub async fn delete_conference(
    State(state): State<AppState>,
    Path(conference_id): Path<i64>,
    req: Request,
) -> ApiResult<StatusCode> {
    require_scope(&req, TokenScope::ConferenceAdmin)?;

    state.metadata.delete_conference(conference_id).await?;
    state
        .schedule_cache
        .invalidate(&schedule_cache_key(conference_id));
    tracing::info!(conference_id, "Conference deleted");

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub scopes: Vec<String>,
    pub expires_in_secs: Option<u64>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token_id: String,
    pub token_secret: String,
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenInfo {
    pub token_id: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<String>,
    pub revoked_at: Option<String>,
    pub created_at: String,
    pub last_used_at: Option<String>,
    pub description: Option<String>,
}

/// POST /v1/admin/tokens
pub async fn create_token(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<CreateTokenResponse>)> {
    require_scope(&req, TokenScope::ConferenceAdmin)?;

    let body: CreateTokenRequest = read_json(req, MAX_ADMIN_BODY_SIZE).await?;
    if body.scopes.is_empty() {
        return Err(ApiError::BadRequest("at least one scope is required".to_string()));
    }
    for scope in &body.scopes {
        TokenScope::parse(scope)
            .map_err(|_| ApiError::BadRequest(format!("invalid scope: {scope}")))?;
    }

    let token_secret = generate_token_secret();
    let now = OffsetDateTime::now_utc();
    let expires_at = match body.expires_in_secs {
        Some(secs) => {
            let secs: i64 = secs.try_into().map_err(|_| {
                ApiError::BadRequest(format!("expires_in_secs too large: {secs}"))
            })?;
            Some(now + time::Duration::seconds(secs))
        }
        None => None,
    };

    let scopes = serde_json::to_string(&body.scopes)
        .map_err(|e| ApiError::Internal(format!("failed to serialize scopes: {e}")))?;

    let token = TokenRow {
        token_id: Uuid::new_v4(),
        token_hash: hash_token(&token_secret),
        scopes,
        expires_at,
        revoked_at: None,
        created_at: now,
        last_used_at: None,
        description: body.description,
    };
    state.metadata.create_token(&token).await?;
    tracing::info!(token_id = %token.token_id, "Token created");

    Ok((
        StatusCode::CREATED,
        Json(CreateTokenResponse {
            token_id: token.token_id.to_string(),
            token_secret,
            expires_at: format_optional_timestamp(expires_at)?,
        }),
    ))
}

/// GET /v1/admin/tokens
pub async fn list_tokens(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<Vec<TokenInfo>>> {
    require_scope(&req, TokenScope::ConferenceAdmin)?;

    let tokens = state
        .metadata
        .list_tokens()
        .await?
        .into_iter()
        .map(|token| {
            let scopes: Vec<String> = serde_json::from_str(&token.scopes)
                .map_err(|e| ApiError::Internal(format!("invalid token scopes: {e}")))?;
            Ok(TokenInfo {
                token_id: token.token_id.to_string(),
                scopes,
                expires_at: format_optional_timestamp(token.expires_at)?,
                revoked_at: format_optional_timestamp(token.revoked_at)?,
                created_at: format_timestamp(token.created_at)?,
                last_used_at: format_optional_timestamp(token.last_used_at)?,
                description: token.description,
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(tokens))
}

/// DELETE /v1/admin/tokens/{token_id}
pub async fn revoke_token(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
    req: Request,
) -> ApiResult<StatusCode> {
    require_scope(&req, TokenScope::ConferenceAdmin)?;

    let token_id = Uuid::parse_str(&token_id)
        .map_err(|e| ApiError::BadRequest(format!("invalid token ID: {e}")))?;

    state
        .metadata
        .revoke_token(token_id, OffsetDateTime::now_utc())
        .await?;
    tracing::info!(token_id = %token_id, "Token revoked");

    Ok(StatusCode::NO_CONTENT)
}

/// Random token secret, 32 bytes from the thread RNG, URL-safe base64.
fn generate_token_secret() -> String {
    use base64::Engine;
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_validation() {
        assert!(validate_slug("devconf-2026").is_ok());
        assert!(validate_slug("ab").is_err());
        assert!(validate_slug("-devconf").is_err());
        assert!(validate_slug("DevConf").is_err());
        assert!(validate_slug("dev conf").is_err());
    }

    #[test]
    fn token_secrets_are_unique_and_url_safe() {
        let a = generate_token_secret();
        let b = generate_token_secret();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
