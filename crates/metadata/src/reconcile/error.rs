use podium_core::ResourceKind;
use thiserror::Error;

/// Failures that abort a reconciliation. Any of them rolls back the whole
/// transaction.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A modification targeted a row that no longer exists.
    #[error("update target {id} in {table} no longer exists")]
    MissingTarget { table: &'static str, id: i64 },

    /// A staged record references a client id that resolves to no row.
    #[error("{kind} record references unknown {related} id '{client_id}'")]
    UnresolvedReference {
        kind: ResourceKind,
        related: ResourceKind,
        client_id: String,
    },

    /// A step ran before a kind it references had been reconciled.
    #[error("{kind} reconciled before {missing}")]
    OutOfOrder {
        kind: ResourceKind,
        missing: ResourceKind,
    },

    /// Two staged records of one collection share a client id.
    #[error("duplicate {kind} id '{client_id}'")]
    DuplicateIdentifier {
        kind: ResourceKind,
        client_id: String,
    },

    /// A batch insert returned a different number of rows than it was given.
    #[error("{table}: inserted {expected} rows but {returned} were returned")]
    RowCountMismatch {
        table: &'static str,
        expected: usize,
        returned: usize,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
