use super::ReconcileError;
use podium_core::ResourceKind;
use podium_core::diff::Tracked;
use std::collections::HashMap;

/// Client id -> real id for one resource kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup(HashMap<String, i64>);

impl Lookup {
    /// Seed a lookup from stored rows that carry a correlation ref.
    pub fn from_tracked<R: Tracked>(rows: &[R]) -> Self {
        Self(
            rows.iter()
                .filter_map(|row| row.correlation_ref().map(|r| (r.to_string(), row.id())))
                .collect(),
        )
    }

    pub fn insert(&mut self, client_id: impl Into<String>, id: i64) {
        self.0.insert(client_id.into(), id);
    }

    pub fn get(&self, client_id: &str) -> Option<i64> {
        self.0.get(client_id).copied()
    }

}

/// The lookups accumulated by one reconciliation, keyed by resource kind.
///
/// Each step consumes the context and returns it extended with its own
/// lookup, so a later step can only see kinds that were already written.
#[derive(Debug, Clone, Default)]
pub struct LookupContext {
    lookups: HashMap<ResourceKind, Lookup>,
}

impl LookupContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, kind: ResourceKind, lookup: Lookup) -> Self {
        self.lookups.insert(kind, lookup);
        self
    }

    pub fn lookup(&self, kind: ResourceKind) -> Option<&Lookup> {
        self.lookups.get(&kind)
    }

    /// Fail unless every kind `kind` references already has a lookup.
    pub fn require_dependencies(&self, kind: ResourceKind) -> Result<(), ReconcileError> {
        match kind
            .dependencies()
            .iter()
            .find(|dependency| self.lookup(**dependency).is_none())
        {
            Some(missing) => Err(ReconcileError::OutOfOrder {
                kind,
                missing: *missing,
            }),
            None => Ok(()),
        }
    }

    /// Resolve a reference from a `kind` record to a `related` record.
    pub fn related(
        &self,
        kind: ResourceKind,
        related: ResourceKind,
        client_id: &str,
    ) -> Result<i64, ReconcileError> {
        self.lookups
            .get(&related)
            .and_then(|lookup| lookup.get(client_id))
            .ok_or_else(|| ReconcileError::UnresolvedReference {
                kind,
                related,
                client_id: client_id.to_string(),
            })
    }
}
