use super::ReconcileError;
use crate::models::ContentState;
use podium_core::diff::{
    DiffOptions, Differential, RefIndex, Staged, Tracked, diff_relationship, diff_resource,
    find_duplicate_id,
};
use podium_core::resources::{
    ConferenceSnapshot, ResourceKind, StagedLabel, StagedPerson, StagedSession,
    StagedSessionLabel, StagedSessionLink, StagedSessionPerson, StagedTaxonomy,
};
use podium_core::summary::DiffSummary;
use serde::Serialize;
use std::collections::HashSet;

/// Options for one reconciliation request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Delete rows that carry no correlation ref.
    pub delete_untracked: bool,
    /// Fail on a client id used twice in one collection instead of keeping
    /// the last record.
    pub reject_duplicate_ids: bool,
}

/// One differential per managed collection. Unmanaged collections are `None`
/// and are left out of the serialized plan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcilePlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomies: Option<Differential<StagedTaxonomy>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Differential<StagedLabel>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub people: Option<Differential<StagedPerson>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Differential<StagedSession>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_links: Option<Differential<StagedSessionLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_labels: Option<Differential<StagedSessionLabel>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_people: Option<Differential<StagedSessionPerson>>,
}

impl ReconcilePlan {
    /// Per-collection counts, managed collections only.
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::new();
        record(&mut summary, ResourceKind::Taxonomies, &self.taxonomies);
        record(&mut summary, ResourceKind::Labels, &self.labels);
        record(&mut summary, ResourceKind::People, &self.people);
        record(&mut summary, ResourceKind::Sessions, &self.sessions);
        record(&mut summary, ResourceKind::SessionLinks, &self.session_links);
        record(&mut summary, ResourceKind::SessionLabels, &self.session_labels);
        record(&mut summary, ResourceKind::SessionPeople, &self.session_people);
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.summary().is_empty()
    }
}

fn record<T>(summary: &mut DiffSummary, kind: ResourceKind, diff: &Option<Differential<T>>) {
    if let Some(diff) = diff {
        summary.record(kind.as_str(), diff);
    }
}

/// Diff every collection present in `snapshot` against `state`.
///
/// Pure: reads nothing beyond its arguments, so a dry run is exactly this
/// call. Join collections are diffed against the rows their parents will
/// still have after reconciliation; a reference to a parent that is being
/// deleted or never existed stays pending and fails when the plan is applied.
pub fn plan(
    snapshot: &ConferenceSnapshot,
    state: &ContentState,
    options: ReconcileOptions,
) -> Result<ReconcilePlan, ReconcileError> {
    if options.reject_duplicate_ids {
        check_duplicates(ResourceKind::Taxonomies, &snapshot.taxonomies)?;
        check_duplicates(ResourceKind::Labels, &snapshot.labels)?;
        check_duplicates(ResourceKind::People, &snapshot.people)?;
        check_duplicates(ResourceKind::Sessions, &snapshot.sessions)?;
        check_duplicates(ResourceKind::SessionLinks, &snapshot.session_links)?;
        check_duplicates(ResourceKind::SessionLabels, &snapshot.session_labels)?;
        check_duplicates(ResourceKind::SessionPeople, &snapshot.session_people)?;
    }

    let diff_options = DiffOptions {
        delete_untracked: options.delete_untracked,
    };
    let sessions = surviving(&state.sessions, &snapshot.sessions);

    Ok(ReconcilePlan {
        taxonomies: snapshot
            .taxonomies
            .as_deref()
            .map(|input| diff_resource(input, &state.taxonomies, diff_options)),
        labels: snapshot
            .labels
            .as_deref()
            .map(|input| diff_resource(input, &state.labels, diff_options)),
        people: snapshot
            .people
            .as_deref()
            .map(|input| diff_resource(input, &state.people, diff_options)),
        sessions: snapshot
            .sessions
            .as_deref()
            .map(|input| diff_resource(input, &state.sessions, diff_options)),
        session_links: snapshot
            .session_links
            .as_deref()
            .map(|input| diff_resource(input, &state.session_links, diff_options)),
        session_labels: snapshot.session_labels.as_deref().map(|input| {
            let labels = surviving(&state.labels, &snapshot.labels);
            diff_relationship(input, &state.session_labels, &[sessions.clone(), labels])
        }),
        session_people: snapshot.session_people.as_deref().map(|input| {
            let people = surviving(&state.people, &snapshot.people);
            diff_relationship(input, &state.session_people, &[sessions.clone(), people])
        }),
    })
}

fn check_duplicates<S: Staged>(
    kind: ResourceKind,
    input: &Option<Vec<S>>,
) -> Result<(), ReconcileError> {
    match input.as_deref().and_then(find_duplicate_id) {
        Some(client_id) => Err(ReconcileError::DuplicateIdentifier {
            kind,
            client_id: client_id.to_string(),
        }),
        None => Ok(()),
    }
}

/// Refs of the stored rows that will still exist once `staged` is applied.
/// An unmanaged collection keeps every tracked row.
fn surviving<R: Tracked, S: Staged>(rows: &[R], staged: &Option<Vec<S>>) -> RefIndex {
    let Some(staged) = staged else {
        return RefIndex::from_tracked(rows);
    };
    let ids: HashSet<&str> = staged.iter().map(Staged::client_id).collect();
    rows.iter()
        .filter_map(|row| {
            row.correlation_ref()
                .filter(|r| ids.contains(r))
                .map(|r| (r.to_string(), row.id()))
        })
        .collect()
}
