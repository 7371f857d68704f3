//! Staged conference content submitted by admin clients.
//!
//! Every staged record carries a client-local `id`. It is never a database key:
//! it correlates staged records with each other inside one request, and it is
//! persisted as the `correlation_ref` of the row it creates so later requests
//! can re-match the same row.

use crate::diff::{Staged, StagedRelation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

/// Text keyed by locale (e.g. `{"en": "Keynote", "fr": "Plénière"}`).
pub type Localised = BTreeMap<String, String>;

/// A grouping of labels (e.g. "Theme", "Track").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedTaxonomy {
    pub id: String,
    pub title: Localised,
    #[serde(default)]
    pub icon: Option<String>,
}

/// A label inside a taxonomy, referenced by the taxonomy's client-local id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedLabel {
    pub id: String,
    pub taxonomy_id: String,
    pub title: Localised,
    #[serde(default)]
    pub icon: Option<String>,
}

/// A speaker or host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedPerson {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subtitle: Localised,
    #[serde(default)]
    pub bio: Localised,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A scheduled slot: a talk, a workshop, a break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedSession {
    pub id: String,
    #[serde(default = "default_session_kind")]
    pub kind: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub title: Localised,
    #[serde(default)]
    pub details: Localised,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub location: Option<String>,
}

fn default_session_kind() -> String {
    "session".to_string()
}

/// An external link attached to a session (slides, recording, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedSessionLink {
    pub id: String,
    pub session_id: String,
    pub kind: String,
    pub url: String,
    #[serde(default)]
    pub title: Localised,
}

/// Join between a session and a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedSessionLabel {
    pub id: String,
    pub session_id: String,
    pub label_id: String,
}

/// Join between a session and a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedSessionPerson {
    pub id: String,
    pub session_id: String,
    pub person_id: String,
}

macro_rules! impl_staged {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Staged for $ty {
                fn client_id(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

impl_staged!(
    StagedTaxonomy,
    StagedLabel,
    StagedPerson,
    StagedSession,
    StagedSessionLink,
    StagedSessionLabel,
    StagedSessionPerson,
);

impl StagedRelation for StagedSessionLabel {
    fn related_client_ids(&self) -> Vec<&str> {
        vec![self.session_id.as_str(), self.label_id.as_str()]
    }
}

impl StagedRelation for StagedSessionPerson {
    fn related_client_ids(&self) -> Vec<&str> {
        vec![self.session_id.as_str(), self.person_id.as_str()]
    }
}

/// The full staged view of a conference's managed content.
///
/// A collection left out (`None`) is not managed by the request: its rows are
/// neither diffed nor touched. An empty collection removes every tracked row
/// of that type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceSnapshot {
    #[serde(default)]
    pub taxonomies: Option<Vec<StagedTaxonomy>>,
    #[serde(default)]
    pub labels: Option<Vec<StagedLabel>>,
    #[serde(default)]
    pub people: Option<Vec<StagedPerson>>,
    #[serde(default)]
    pub sessions: Option<Vec<StagedSession>>,
    #[serde(default)]
    pub session_links: Option<Vec<StagedSessionLink>>,
    #[serde(default)]
    pub session_labels: Option<Vec<StagedSessionLabel>>,
    #[serde(default)]
    pub session_people: Option<Vec<StagedSessionPerson>>,
}

impl ConferenceSnapshot {
    /// Resource kinds present in this snapshot, in dependency order.
    pub fn managed_kinds(&self) -> Vec<ResourceKind> {
        ResourceKind::DEPENDENCY_ORDER
            .into_iter()
            .filter(|kind| match kind {
                ResourceKind::Taxonomies => self.taxonomies.is_some(),
                ResourceKind::Labels => self.labels.is_some(),
                ResourceKind::People => self.people.is_some(),
                ResourceKind::Sessions => self.sessions.is_some(),
                ResourceKind::SessionLinks => self.session_links.is_some(),
                ResourceKind::SessionLabels => self.session_labels.is_some(),
                ResourceKind::SessionPeople => self.session_people.is_some(),
            })
            .collect()
    }
}

/// Body of the taxonomy reconciliation route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonomySnapshot {
    pub taxonomies: Vec<StagedTaxonomy>,
    pub labels: Vec<StagedLabel>,
}

impl From<TaxonomySnapshot> for ConferenceSnapshot {
    fn from(s: TaxonomySnapshot) -> Self {
        Self {
            taxonomies: Some(s.taxonomies),
            labels: Some(s.labels),
            ..Default::default()
        }
    }
}

/// Body of the schedule reconciliation route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleSnapshot {
    pub people: Vec<StagedPerson>,
    pub sessions: Vec<StagedSession>,
    #[serde(default)]
    pub session_links: Vec<StagedSessionLink>,
    #[serde(default)]
    pub session_labels: Vec<StagedSessionLabel>,
    #[serde(default)]
    pub session_people: Vec<StagedSessionPerson>,
}

impl From<ScheduleSnapshot> for ConferenceSnapshot {
    fn from(s: ScheduleSnapshot) -> Self {
        Self {
            people: Some(s.people),
            sessions: Some(s.sessions),
            session_links: Some(s.session_links),
            session_labels: Some(s.session_labels),
            session_people: Some(s.session_people),
            ..Default::default()
        }
    }
}

/// The resource collections under reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Taxonomies,
    Labels,
    People,
    Sessions,
    SessionLinks,
    SessionLabels,
    SessionPeople,
}

impl ResourceKind {
    /// Every kind, ordered so that a kind only references kinds before it.
    pub const DEPENDENCY_ORDER: [ResourceKind; 7] = [
        Self::Taxonomies,
        Self::Labels,
        Self::People,
        Self::Sessions,
        Self::SessionLinks,
        Self::SessionLabels,
        Self::SessionPeople,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Taxonomies => "taxonomies",
            Self::Labels => "labels",
            Self::People => "people",
            Self::Sessions => "sessions",
            Self::SessionLinks => "session_links",
            Self::SessionLabels => "session_labels",
            Self::SessionPeople => "session_people",
        }
    }

    /// Kinds this kind references by client-local id.
    pub fn dependencies(&self) -> &'static [ResourceKind] {
        match self {
            Self::Taxonomies | Self::People | Self::Sessions => &[],
            Self::Labels => &[Self::Taxonomies],
            Self::SessionLinks => &[Self::Sessions],
            Self::SessionLabels => &[Self::Sessions, Self::Labels],
            Self::SessionPeople => &[Self::Sessions, Self::People],
        }
    }

    /// Join tables are never updated, only kept, added or deleted.
    pub fn is_relationship(&self) -> bool {
        matches!(self, Self::SessionLabels | Self::SessionPeople)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
