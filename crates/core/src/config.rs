//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body for admin routes, in bytes.
    /// Full schedule snapshots for large conferences run to a few MiB.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// SECURITY: When enabled, ensure this endpoint is network-restricted
    /// to authorized Prometheus scraper IPs only at the infrastructure level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_body_bytes == 0 {
            return Err("server.max_body_bytes must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Admin token configuration.
///
/// The admin token is required for server operation. It provides initial access
/// to create conferences and issue further tokens. If the token hash changes
/// between restarts, the previous admin token is revoked and a new one is created.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Pre-computed hash of the admin token (SHA256 hex, 64 characters).
    /// Generate with: `echo -n "your-secret-token" | sha256sum`
    pub token_hash: String,
    /// Description for the admin token.
    pub token_description: Option<String>,
}

impl AdminConfig {
    /// Create a test configuration with a dummy token hash.
    ///
    /// **For testing only.** The hash is deterministic but not a real token.
    pub fn for_testing() -> Self {
        Self {
            // SHA256 of "test-admin-token"
            token_hash: "9f735e0df9a1ddc702bf0a1a7b83033f9f7153a00c29de82cedadc9957289b05"
                .to_string(),
            token_description: Some("Test admin token".to_string()),
        }
    }

    /// The token hash, lowercased and without its optional `sha256:` prefix.
    pub fn normalized_hash(&self) -> Result<String, String> {
        let hash = self
            .token_hash
            .strip_prefix("sha256:")
            .unwrap_or(&self.token_hash)
            .to_lowercase();
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("invalid admin token_hash: expected 64 hex chars".to_string());
        }
        Ok(hash)
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database.
    Sqlite {
        /// Database file path (":memory:" for an in-process database).
        path: PathBuf,
        /// Query timeout in seconds (advisory only - SQLite cannot force-cancel queries).
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
    },
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(600)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/podium.db"),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
        }
    }
}

impl MetadataConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { path, .. } if path.as_os_str().is_empty() => {
                Err("sqlite config requires a non-empty 'path'".to_string())
            }
            MetadataConfig::Sqlite { .. } => Ok(()),
        }
    }
}

/// Reconciliation behaviour.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Reject snapshots in which two records of one collection share a
    /// client-local id. When false, the last record with that id wins.
    #[serde(default)]
    pub reject_duplicate_ids: bool,
    /// Delete rows without a correlation ref when the request does not say.
    #[serde(default)]
    pub delete_untracked_default: bool,
}

/// Derived read-model cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached legacy schedule projection, in seconds.
    #[serde(default = "default_schedule_ttl_secs")]
    pub schedule_ttl_secs: u64,
    /// Maximum number of cached projections.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

fn default_schedule_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    1024
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            schedule_ttl_secs: default_schedule_ttl_secs(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn schedule_ttl(&self) -> Duration {
        Duration::from_secs(self.schedule_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == 0 {
            return Err("cache.max_entries must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Admin token configuration (required).
    pub admin: AdminConfig,
    /// Reconciliation configuration.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    /// Read-model cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses SQLite metadata and a dummy admin token.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            metadata: MetadataConfig::default(),
            admin: AdminConfig::for_testing(),
            reconcile: ReconcileConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Validate every section, returning the first problem found.
    pub fn validate(&self) -> crate::Result<()> {
        self.server
            .validate()
            .and_then(|_| self.metadata.validate())
            .and_then(|_| self.admin.normalized_hash().map(|_| ()))
            .and_then(|_| self.cache.validate())
            .map_err(crate::Error::InvalidConfig)
    }
}
