//! Conference content: current state and snapshot reconciliation.

use super::common::read_json;
use crate::auth::require_scope;
use crate::cache::schedule_cache_key;
use crate::error::ApiResult;
use crate::metrics::{RECONCILE_DURATION, record_reconciled_rows, record_reconciliation};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, Request, State};
use axum::response::{IntoResponse, Response};
use podium_core::ConferenceSnapshot;
use podium_core::resources::{ScheduleSnapshot, TaxonomySnapshot};
use podium_core::token::TokenScope;
use podium_metadata::ReconcileOptions;
use podium_metadata::models::ContentState;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// How a reconciliation request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Commit,
    /// Plan only, answer with counts.
    DryRun,
    /// Plan only, answer with every differential.
    DryRunVerbose,
}

/// Query parameters of the reconciliation routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileQuery {
    pub dry_run: Option<String>,
    pub delete_untracked: Option<String>,
}

impl ReconcileQuery {
    pub fn mode(&self) -> Mode {
        match self.dry_run.as_deref() {
            None => Mode::Commit,
            Some("verbose") => Mode::DryRunVerbose,
            Some(_) => Mode::DryRun,
        }
    }

    /// `deleteUntracked`, `deleteUntracked=true` and `deleteUntracked=1` enable
    /// deletion; leaving it out falls back to `default`.
    pub fn delete_untracked(&self, default: bool) -> bool {
        match self.delete_untracked.as_deref() {
            None => default,
            Some(value) => matches!(value, "" | "true" | "1"),
        }
    }
}

/// GET /v1/admin/conferences/{conference_id}/content
pub async fn get_content(
    State(state): State<AppState>,
    Path(conference_id): Path<i64>,
    req: Request,
) -> ApiResult<Json<ContentState>> {
    require_scope(&req, TokenScope::ConferenceRead)?;
    Ok(Json(state.metadata.load_content(conference_id).await?))
}

/// PUT /v1/admin/conferences/{conference_id}/content
///
/// Any subset of the seven collections; left-out collections are untouched.
pub async fn put_content(
    state: State<AppState>,
    conference_id: Path<i64>,
    query: Query<ReconcileQuery>,
    req: Request,
) -> ApiResult<Response> {
    reconcile::<ConferenceSnapshot>(state, conference_id, query, req).await
}

/// PUT /v1/admin/conferences/{conference_id}/taxonomies
pub async fn put_taxonomies(
    state: State<AppState>,
    conference_id: Path<i64>,
    query: Query<ReconcileQuery>,
    req: Request,
) -> ApiResult<Response> {
    reconcile::<TaxonomySnapshot>(state, conference_id, query, req).await
}

/// PUT /v1/admin/conferences/{conference_id}/schedule
pub async fn put_schedule(
    state: State<AppState>,
    conference_id: Path<i64>,
    query: Query<ReconcileQuery>,
    req: Request,
) -> ApiResult<Response> {
    reconcile::<ScheduleSnapshot>(state, conference_id, query, req).await
}

async fn reconcile<B>(
    State(state): State<AppState>,
    Path(conference_id): Path<i64>,
    Query(query): Query<ReconcileQuery>,
    req: Request,
) -> ApiResult<Response>
where
    B: DeserializeOwned + Into<ConferenceSnapshot>,
{
    require_scope(&req, TokenScope::ConferenceAdmin)?;

    let body: B = read_json(req, state.config.server.max_body_bytes).await?;
    let snapshot: ConferenceSnapshot = body.into();

    let mode = query.mode();
    tracing::debug!(
        conference_id,
        kinds = ?snapshot.managed_kinds(),
        ?mode,
        "Reconciling snapshot"
    );
    let options = ReconcileOptions {
        delete_untracked: query.delete_untracked(state.config.reconcile.delete_untracked_default),
        reject_duplicate_ids: state.config.reconcile.reject_duplicate_ids,
    };

    if mode != Mode::Commit {
        let plan = state
            .metadata
            .plan_content(conference_id, &snapshot, options)
            .await
            .inspect_err(|_| record_reconciliation("failed"))?;
        record_reconciliation("dry_run");

        let summary = plan.summary();
        tracing::info!(
            conference_id,
            dry_run = true,
            additions = summary.total.additions,
            modifications = summary.total.modifications,
            deletions = summary.total.deletions,
            "Reconciliation planned"
        );

        return Ok(match mode {
            Mode::DryRunVerbose => Json(plan).into_response(),
            _ => Json(summary).into_response(),
        });
    }

    let timer = RECONCILE_DURATION.start_timer();
    let result = state
        .metadata
        .reconcile_content(conference_id, &snapshot, options)
        .await;
    timer.observe_duration();

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            record_reconciliation("failed");
            tracing::warn!(conference_id, error = %e, "Reconciliation failed");
            return Err(e.into());
        }
    };

    if summary.is_empty() {
        record_reconciliation("unchanged");
    } else {
        record_reconciliation("committed");
        record_reconciled_rows(&summary);
        state
            .schedule_cache
            .invalidate(&schedule_cache_key(conference_id));
    }

    tracing::info!(
        conference_id,
        dry_run = false,
        additions = summary.total.additions,
        modifications = summary.total.modifications,
        deletions = summary.total.deletions,
        "Reconciliation committed"
    );

    Ok(Json(summary).into_response())
}
