//! Metadata store error types.

use crate::reconcile::ReconcileError;
use thiserror::Error;

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
}

impl MetadataError {
    /// Classify a failed write: unique and foreign key violations become
    /// [`MetadataError::Constraint`], anything else stays a database error.
    pub fn from_write(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
                Self::Constraint(db.message().to_string())
            }
            _ => Self::Database(err),
        }
    }
}

impl From<std::io::Error> for MetadataError {
    fn from(e: std::io::Error) -> Self {
        MetadataError::Config(e.to_string())
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
