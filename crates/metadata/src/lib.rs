//! Metadata store for Podium.
//!
//! This crate owns the relational side of the system:
//! - Conferences and their content tables
//! - Reconciliation of staged snapshots against stored rows
//! - API tokens and the bootstrap admin marker

pub mod error;
pub mod models;
pub mod reconcile;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use reconcile::{ReconcileError, ReconcileOptions, ReconcilePlan};
pub use store::{MetadataStore, SqliteStore};

use podium_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite {
            path,
            query_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *query_timeout_secs).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
