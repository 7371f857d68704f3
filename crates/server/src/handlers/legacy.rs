//! Legacy read API.
//!
//! `GET /legacy/{conference_id}/schedule` serves the whole schedule of a
//! conference in one document: sessions with their speakers, labels and links
//! resolved inline. The projection is cached per conference and dropped by
//! every committed write to that conference.

use crate::cache::schedule_cache_key;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use podium_core::Localised;
use podium_metadata::models::{
    ConferenceRow, ContentState, LabelRow, PersonRow, SessionLinkRow, SessionRow, TaxonomyRow,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Debug, Serialize)]
pub struct LegacySchedule<'a> {
    pub conference: LegacyConference<'a>,
    pub taxonomies: Vec<LegacyTaxonomy<'a>>,
    pub sessions: Vec<LegacySession<'a>>,
}

#[derive(Debug, Serialize)]
pub struct LegacyConference<'a> {
    pub id: i64,
    pub slug: &'a str,
    pub title: &'a Localised,
}

#[derive(Debug, Serialize)]
pub struct LegacyTaxonomy<'a> {
    pub id: i64,
    pub title: &'a Localised,
    pub icon: Option<&'a str>,
    pub labels: Vec<LegacyLabel<'a>>,
}

#[derive(Debug, Serialize)]
pub struct LegacyLabel<'a> {
    pub id: i64,
    pub title: &'a Localised,
    pub icon: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct LegacySpeaker<'a> {
    pub id: i64,
    pub name: &'a str,
    pub subtitle: &'a Localised,
    pub bio: &'a Localised,
    pub avatar: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct LegacyLink<'a> {
    pub kind: &'a str,
    pub url: &'a str,
    pub title: &'a Localised,
}

#[derive(Debug, Serialize)]
pub struct LegacySession<'a> {
    pub id: i64,
    pub kind: &'a str,
    pub slug: Option<&'a str>,
    pub title: &'a Localised,
    pub details: &'a Localised,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub location: Option<&'a str>,
    pub speakers: Vec<LegacySpeaker<'a>>,
    pub labels: Vec<LegacyLabel<'a>>,
    pub links: Vec<LegacyLink<'a>>,
}

fn label(row: &LabelRow) -> LegacyLabel<'_> {
    LegacyLabel {
        id: row.id,
        title: &row.title.0,
        icon: row.icon.as_deref(),
    }
}

fn speaker(row: &PersonRow) -> LegacySpeaker<'_> {
    LegacySpeaker {
        id: row.id,
        name: &row.name,
        subtitle: &row.subtitle.0,
        bio: &row.bio.0,
        avatar: row.avatar.as_deref(),
    }
}

fn link(row: &SessionLinkRow) -> LegacyLink<'_> {
    LegacyLink {
        kind: &row.kind,
        url: &row.url,
        title: &row.title.0,
    }
}

fn taxonomy<'a>(row: &'a TaxonomyRow, labels: &'a [LabelRow]) -> LegacyTaxonomy<'a> {
    LegacyTaxonomy {
        id: row.id,
        title: &row.title.0,
        icon: row.icon.as_deref(),
        labels: labels
            .iter()
            .filter(|l| l.taxonomy_id == row.id)
            .map(label)
            .collect(),
    }
}

/// Build the schedule document. Sessions are ordered by start date (undated
/// sessions last), then by id.
pub fn project<'a>(conference: &'a ConferenceRow, content: &'a ContentState) -> LegacySchedule<'a> {
    let people: HashMap<i64, &PersonRow> = content.people.iter().map(|p| (p.id, p)).collect();
    let labels: HashMap<i64, &LabelRow> = content.labels.iter().map(|l| (l.id, l)).collect();

    let mut speakers_of: HashMap<i64, Vec<LegacySpeaker<'a>>> = HashMap::new();
    for join in &content.session_people {
        if let Some(&person) = people.get(&join.person_id) {
            speakers_of
                .entry(join.session_id)
                .or_default()
                .push(speaker(person));
        }
    }

    let mut labels_of: HashMap<i64, Vec<LegacyLabel<'a>>> = HashMap::new();
    for join in &content.session_labels {
        if let Some(&row) = labels.get(&join.label_id) {
            labels_of.entry(join.session_id).or_default().push(label(row));
        }
    }

    let mut links_of: HashMap<i64, Vec<LegacyLink<'a>>> = HashMap::new();
    for row in &content.session_links {
        links_of.entry(row.session_id).or_default().push(link(row));
    }

    let mut sessions: Vec<&SessionRow> = content.sessions.iter().collect();
    sessions.sort_by_key(|s| (s.start_date.is_none(), s.start_date, s.id));

    LegacySchedule {
        conference: LegacyConference {
            id: conference.id,
            slug: &conference.slug,
            title: &conference.title.0,
        },
        taxonomies: content
            .taxonomies
            .iter()
            .map(|t| taxonomy(t, &content.labels))
            .collect(),
        sessions: sessions
            .into_iter()
            .map(|s| LegacySession {
                id: s.id,
                kind: &s.kind,
                slug: s.slug.as_deref(),
                title: &s.title.0,
                details: &s.details.0,
                start_date: s.start_date,
                end_date: s.end_date,
                location: s.location.as_deref(),
                speakers: speakers_of.remove(&s.id).unwrap_or_default(),
                labels: labels_of.remove(&s.id).unwrap_or_default(),
                links: links_of.remove(&s.id).unwrap_or_default(),
            })
            .collect(),
    }
}

/// GET /legacy/{conference_id}/schedule - Unauthenticated.
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(conference_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let key = schedule_cache_key(conference_id);
    if let Some(cached) = state.schedule_cache.get(&key) {
        return Ok(Json(cached.as_ref().clone()));
    }

    let conference = state
        .metadata
        .get_conference(conference_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("conference {conference_id}")))?;
    let content = state.metadata.load_content(conference_id).await?;

    let document = serde_json::to_value(project(&conference, &content))
        .map_err(|e| ApiError::Internal(format!("failed to serialize schedule: {e}")))?;
    let document = Arc::new(document);
    state.schedule_cache.insert(key, document.clone());

    Ok(Json(document.as_ref().clone()))
}
