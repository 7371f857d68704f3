//! Change counts for reconciliation plans.

use crate::diff::Differential;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::AddAssign;

/// Number of additions, modifications and deletions in a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffCounts {
    pub additions: u64,
    pub modifications: u64,
    pub deletions: u64,
}

impl DiffCounts {
    pub fn of<T>(diff: &Differential<T>) -> Self {
        Self {
            additions: diff.additions.len() as u64,
            modifications: diff.modifications.len() as u64,
            deletions: diff.deletions.len() as u64,
        }
    }

    pub fn changes(&self) -> u64 {
        self.additions + self.modifications + self.deletions
    }
}

impl AddAssign for DiffCounts {
    fn add_assign(&mut self, other: Self) {
        self.additions += other.additions;
        self.modifications += other.modifications;
        self.deletions += other.deletions;
    }
}

/// Per-resource counts plus their total.
///
/// Serializes flat: `{"taxonomies": {...}, "labels": {...}, "total": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    #[serde(flatten)]
    pub resources: BTreeMap<String, DiffCounts>,
    pub total: DiffCounts,
}

impl DiffSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarize a single plan.
    pub fn single<T>(name: impl Into<String>, diff: &Differential<T>) -> Self {
        let mut summary = Self::new();
        summary.record(name, diff);
        summary
    }

    pub fn from_counts<I, K>(counts: I) -> Self
    where
        I: IntoIterator<Item = (K, DiffCounts)>,
        K: Into<String>,
    {
        let mut summary = Self::new();
        for (name, counts) in counts {
            summary.add_counts(name, counts);
        }
        summary
    }

    /// Add the counts of one resource's plan.
    pub fn record<T>(&mut self, name: impl Into<String>, diff: &Differential<T>) -> &mut Self {
        self.add_counts(name, DiffCounts::of(diff));
        self
    }

    fn add_counts(&mut self, name: impl Into<String>, counts: DiffCounts) {
        *self.resources.entry(name.into()).or_default() += counts;
        self.total += counts;
    }

    /// True when no resource has any change.
    pub fn is_empty(&self) -> bool {
        self.total.changes() == 0
    }
}
