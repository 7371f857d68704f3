//! Application state shared across handlers.

use crate::cache::ScheduleCache;
use podium_core::config::AppConfig;
use podium_metadata::MetadataStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Cached legacy schedule projections, invalidated after writes commit.
    pub schedule_cache: Arc<ScheduleCache>,
}

impl AppState {
    pub fn new(config: AppConfig, metadata: Arc<dyn MetadataStore>) -> Self {
        let schedule_cache = Arc::new(ScheduleCache::new(&config.cache));
        Self {
            config: Arc::new(config),
            metadata,
            schedule_cache,
        }
    }
}
