//! Conference repository.

use crate::error::MetadataResult;
use crate::models::{ConferenceRow, NewConference};
use async_trait::async_trait;

/// Repository for conference operations.
#[async_trait]
pub trait ConferenceRepo: Send + Sync {
    /// Create a conference. Fails with `AlreadyExists` on a taken slug.
    async fn create_conference(&self, conference: &NewConference) -> MetadataResult<ConferenceRow>;

    /// Get a conference by ID.
    async fn get_conference(&self, conference_id: i64) -> MetadataResult<Option<ConferenceRow>>;

    /// Get a conference by slug.
    async fn get_conference_by_slug(&self, slug: &str) -> MetadataResult<Option<ConferenceRow>>;

    /// List all conferences.
    async fn list_conferences(&self) -> MetadataResult<Vec<ConferenceRow>>;

    /// Delete a conference and all of its content.
    async fn delete_conference(&self, conference_id: i64) -> MetadataResult<()>;
}
