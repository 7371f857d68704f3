//! Three-way diffing of staged collections against persisted rows.
//!
//! A staged collection is the client's complete desired state for one resource
//! type. Persisted rows are matched to staged records through their
//! `correlation_ref`, the client-local id they were created from:
//! - a row whose ref matches a staged id is a modification target
//! - a row whose ref matches nothing is deleted
//! - a row without a ref is untracked and kept unless explicitly requested
//! - a staged record that matched no row is an addition
//!
//! Join tables are diffed by the real ids of both sides instead (see
//! [`diff_relationship`]) and never produce modifications.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A staged record with a client-local identifier.
pub trait Staged {
    fn client_id(&self) -> &str;
}

/// A staged join record: the client-local ids of each related side, in a
/// fixed order shared with [`ExistingRelation::related_ids`].
pub trait StagedRelation: Staged {
    fn related_client_ids(&self) -> Vec<&str>;
}

/// A persisted row with a database-assigned id.
pub trait Identified {
    fn id(&self) -> i64;
}

/// A persisted row that may be under reconciliation management.
pub trait Tracked: Identified {
    /// The client-local id this row was created from, if any.
    fn correlation_ref(&self) -> Option<&str>;
}

/// A persisted join row: the real ids of each related side.
pub trait ExistingRelation: Identified {
    fn related_ids(&self) -> Vec<i64>;
}

/// A staged value matched to an existing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification<T> {
    pub target: i64,
    pub value: T,
}

/// The reconciliation plan for one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Differential<T> {
    pub additions: Vec<T>,
    pub modifications: Vec<Modification<T>>,
    pub deletions: Vec<i64>,
}

impl<T> Default for Differential<T> {
    fn default() -> Self {
        Self {
            additions: Vec::new(),
            modifications: Vec::new(),
            deletions: Vec::new(),
        }
    }
}

impl<T> Differential<T> {
    /// True when applying this plan would not touch the database.
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.modifications.is_empty() && self.deletions.is_empty()
    }
}

/// Options for [`diff_resource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// Also delete rows that carry no correlation ref.
    pub delete_untracked: bool,
}

/// Diff a staged entity collection against the rows currently persisted.
///
/// Staged records sharing a client-local id collapse to the last one. Use
/// [`find_duplicate_id`] beforehand to reject such input instead.
pub fn diff_resource<S, E>(input: &[S], current: &[E], options: DiffOptions) -> Differential<S>
where
    S: Staged + Clone,
    E: Tracked,
{
    // Index of the last staged record for each client id.
    let by_id: HashMap<&str, usize> = input
        .iter()
        .enumerate()
        .map(|(index, record)| (record.client_id(), index))
        .collect();

    let mut diff = Differential::default();
    let mut visited: HashSet<&str> = HashSet::new();

    for existing in current {
        let Some(reference) = existing.correlation_ref() else {
            if options.delete_untracked {
                diff.deletions.push(existing.id());
            }
            continue;
        };

        match by_id.get_key_value(reference) {
            Some((&client_id, &index)) if !visited.contains(client_id) => {
                visited.insert(client_id);
                diff.modifications.push(Modification {
                    target: existing.id(),
                    value: input[index].clone(),
                });
            }
            // Stale row, or a second row carrying an already matched ref.
            _ => diff.deletions.push(existing.id()),
        }
    }

    diff.additions = input
        .iter()
        .enumerate()
        .filter(|(index, record)| {
            let id = record.client_id();
            by_id.get(id) == Some(index) && !visited.contains(id)
        })
        .map(|(_, record)| record.clone())
        .collect();

    diff
}

/// Return the first client-local id that appears more than once.
pub fn find_duplicate_id<S: Staged>(input: &[S]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(input.len());
    input
        .iter()
        .map(Staged::client_id)
        .find(|id| !seen.insert(*id))
}

/// Correlation ref -> real id for the existing rows of one related resource.
#[derive(Debug, Clone, Default)]
pub struct RefIndex(HashMap<String, i64>);

impl RefIndex {
    pub fn from_tracked<E: Tracked>(rows: &[E]) -> Self {
        Self(
            rows.iter()
                .filter_map(|row| row.correlation_ref().map(|r| (r.to_string(), row.id())))
                .collect(),
        )
    }

    pub fn get(&self, client_id: &str) -> Option<i64> {
        self.0.get(client_id).copied()
    }
}

impl FromIterator<(String, i64)> for RefIndex {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One component of a join row's composite key.
///
/// `Pending` holds a client-local id whose row does not exist yet. It never
/// equals a `Resolved` id, so a placeholder cannot match an existing join row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Resolved(i64),
    Pending(String),
}

/// Composite key of a join row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey(pub Vec<KeyPart>);

impl CompositeKey {
    fn of_existing<E: ExistingRelation>(row: &E) -> Self {
        Self(row.related_ids().into_iter().map(KeyPart::Resolved).collect())
    }

    fn of_staged<S: StagedRelation>(record: &S, relations: &[RefIndex]) -> Self {
        let ids = record.related_client_ids();
        debug_assert_eq!(ids.len(), relations.len());
        Self(
            ids.into_iter()
                .zip(relations)
                .map(|(client_id, index)| match index.get(client_id) {
                    Some(id) => KeyPart::Resolved(id),
                    None => KeyPart::Pending(client_id.to_string()),
                })
                .collect(),
        )
    }
}

/// Diff a staged join collection against the join rows currently persisted.
///
/// `relations` holds one [`RefIndex`] per key component, in the order returned
/// by [`StagedRelation::related_client_ids`]. Staged references to rows that
/// do not exist yet become pending key parts; the executor resolves them once
/// the parent rows are written.
pub fn diff_relationship<S, E>(input: &[S], current: &[E], relations: &[RefIndex]) -> Differential<S>
where
    S: StagedRelation + Clone,
    E: ExistingRelation,
{
    let existing: HashMap<CompositeKey, i64> = current
        .iter()
        .map(|row| (CompositeKey::of_existing(row), row.id()))
        .collect();

    let mut keep: HashSet<i64> = HashSet::new();
    let mut added: HashSet<CompositeKey> = HashSet::new();
    let mut diff = Differential::default();

    for record in input {
        let key = CompositeKey::of_staged(record, relations);
        match existing.get(&key) {
            Some(id) => {
                keep.insert(*id);
            }
            None => {
                if added.insert(key) {
                    diff.additions.push(record.clone());
                }
            }
        }
    }

    diff.deletions = current
        .iter()
        .map(Identified::id)
        .filter(|id| !keep.contains(id))
        .collect();

    diff
}
