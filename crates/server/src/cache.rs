//! Process-wide cache of derived read models.
//!
//! Entries are keyed by request path (e.g. `/legacy/7/schedule`) and expire
//! after a fixed TTL. Writers invalidate by key once their transaction has
//! committed; invalidating a missing key is a no-op.

use crate::metrics::{
    SCHEDULE_CACHE_HITS, SCHEDULE_CACHE_INVALIDATIONS, SCHEDULE_CACHE_MISSES,
};
use dashmap::DashMap;
use podium_core::config::CacheConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cache key of a conference's legacy schedule projection.
pub fn schedule_cache_key(conference_id: i64) -> String {
    format!("/legacy/{conference_id}/schedule")
}

struct CachedEntry {
    value: Arc<serde_json::Value>,
    stored_at: Instant,
}

/// TTL cache of serialized read models.
pub struct ScheduleCache {
    entries: DashMap<String, CachedEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl ScheduleCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: config.schedule_ttl(),
            max_entries: config.max_entries,
        }
    }

    /// Get a live entry.
    pub fn get(&self, key: &str) -> Option<Arc<serde_json::Value>> {
        let hit = self
            .entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone());

        match hit {
            Some(value) => {
                SCHEDULE_CACHE_HITS.inc();
                Some(value)
            }
            None => {
                SCHEDULE_CACHE_MISSES.inc();
                None
            }
        }
    }

    /// Store an entry, evicting expired entries first and the oldest one if
    /// the cache is still full.
    pub fn insert(&self, key: String, value: Arc<serde_json::Value>) {
        // len() is read before taking any entry lock.
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            let ttl = self.ttl;
            self.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);

            if self.entries.len() >= self.max_entries {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|entry| entry.stored_at)
                    .map(|entry| entry.key().clone());
                if let Some(oldest) = oldest {
                    self.entries.remove(&oldest);
                }
            }
        }

        self.entries.insert(
            key,
            CachedEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop an entry. Returns whether one was present.
    pub fn invalidate(&self, key: &str) -> bool {
        SCHEDULE_CACHE_INVALIDATIONS.inc();
        let removed = self.entries.remove(key).is_some();
        tracing::debug!(key, removed, "cache entry invalidated");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
