//! Conference content repository.

use crate::error::MetadataResult;
use crate::models::ContentState;
use crate::reconcile::{ReconcileOptions, ReconcilePlan};
use async_trait::async_trait;
use podium_core::{ConferenceSnapshot, DiffSummary};

/// Repository for reading and reconciling conference content.
#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Read every content row of a conference.
    async fn load_content(&self, conference_id: i64) -> MetadataResult<ContentState>;

    /// Compute the plan for a snapshot without writing anything.
    async fn plan_content(
        &self,
        conference_id: i64,
        snapshot: &ConferenceSnapshot,
        options: ReconcileOptions,
    ) -> MetadataResult<ReconcilePlan>;

    /// Apply a snapshot in one transaction. Either every managed collection
    /// is reconciled or nothing is written.
    async fn reconcile_content(
        &self,
        conference_id: i64,
        snapshot: &ConferenceSnapshot,
        options: ReconcileOptions,
    ) -> MetadataResult<DiffSummary>;
}
