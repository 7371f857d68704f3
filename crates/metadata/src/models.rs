//! Database models mapping to the metadata schema.

use podium_core::diff::{ExistingRelation, Identified, Tracked};
use podium_core::resources::Localised;
use serde::Serialize;
use sqlx::FromRow;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Conferences
// =============================================================================

/// Conference record. Every content row belongs to exactly one conference.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConferenceRow {
    pub id: i64,
    pub slug: String,
    pub title: Json<Localised>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Values for a new conference.
#[derive(Debug, Clone)]
pub struct NewConference {
    pub slug: String,
    pub title: Localised,
}

// =============================================================================
// Conference content
// =============================================================================

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaxonomyRow {
    pub id: i64,
    pub conference_id: i64,
    pub title: Json<Localised>,
    pub icon: Option<String>,
    pub correlation_ref: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LabelRow {
    pub id: i64,
    pub conference_id: i64,
    pub taxonomy_id: i64,
    pub title: Json<Localised>,
    pub icon: Option<String>,
    pub correlation_ref: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PersonRow {
    pub id: i64,
    pub conference_id: i64,
    pub name: String,
    pub subtitle: Json<Localised>,
    pub bio: Json<Localised>,
    pub avatar: Option<String>,
    pub correlation_ref: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionRow {
    pub id: i64,
    pub conference_id: i64,
    pub kind: String,
    pub slug: Option<String>,
    pub title: Json<Localised>,
    pub details: Json<Localised>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub location: Option<String>,
    pub correlation_ref: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionLinkRow {
    pub id: i64,
    pub conference_id: i64,
    pub session_id: i64,
    pub kind: String,
    pub url: String,
    pub title: Json<Localised>,
    pub correlation_ref: Option<String>,
}

/// Join row: session <-> label.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionLabelRow {
    pub id: i64,
    pub session_id: i64,
    pub label_id: i64,
}

/// Join row: session <-> person.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionPersonRow {
    pub id: i64,
    pub session_id: i64,
    pub person_id: i64,
}

macro_rules! impl_tracked {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identified for $ty {
                fn id(&self) -> i64 {
                    self.id
                }
            }

            impl Tracked for $ty {
                fn correlation_ref(&self) -> Option<&str> {
                    self.correlation_ref.as_deref()
                }
            }
        )*
    };
}

impl_tracked!(TaxonomyRow, LabelRow, PersonRow, SessionRow, SessionLinkRow);

impl Identified for SessionLabelRow {
    fn id(&self) -> i64 {
        self.id
    }
}

impl ExistingRelation for SessionLabelRow {
    fn related_ids(&self) -> Vec<i64> {
        vec![self.session_id, self.label_id]
    }
}

impl Identified for SessionPersonRow {
    fn id(&self) -> i64 {
        self.id
    }
}

impl ExistingRelation for SessionPersonRow {
    fn related_ids(&self) -> Vec<i64> {
        vec![self.session_id, self.person_id]
    }
}

/// Every content row of one conference, as read at one point in time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContentState {
    pub taxonomies: Vec<TaxonomyRow>,
    pub labels: Vec<LabelRow>,
    pub people: Vec<PersonRow>,
    pub sessions: Vec<SessionRow>,
    pub session_links: Vec<SessionLinkRow>,
    pub session_labels: Vec<SessionLabelRow>,
    pub session_people: Vec<SessionPersonRow>,
}

impl ContentState {
    /// Total number of rows across every table.
    pub fn row_count(&self) -> usize {
        self.taxonomies.len()
            + self.labels.len()
            + self.people.len()
            + self.sessions.len()
            + self.session_links.len()
            + self.session_labels.len()
            + self.session_people.len()
    }
}

// =============================================================================
// Tokens
// =============================================================================

/// API token record. Only the SHA-256 hash of the secret is stored.
#[derive(Debug, Clone, FromRow)]
pub struct TokenRow {
    pub token_id: Uuid,
    pub token_hash: String,
    /// JSON array of scope strings.
    pub scopes: String,
    pub expires_at: Option<OffsetDateTime>,
    pub revoked_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub last_used_at: Option<OffsetDateTime>,
    pub description: Option<String>,
}
