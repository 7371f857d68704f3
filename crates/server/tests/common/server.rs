//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use podium_core::config::{AppConfig, MetadataConfig};
use podium_metadata::{MetadataStore, SqliteStore};
use podium_server::bootstrap::ensure_admin_token;
use podium_server::{AppState, create_router};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Secret whose SHA-256 is `AdminConfig::for_testing().token_hash`.
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// A router over a fresh SQLite database.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub sqlite: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("podium.db");

        let sqlite = Arc::new(
            SqliteStore::new(&db_path, None)
                .await
                .expect("Failed to create metadata store"),
        );
        let metadata: Arc<dyn MetadataStore> = sqlite.clone();

        let mut config = AppConfig::for_testing();
        config.metadata = MetadataConfig::Sqlite {
            path: db_path,
            query_timeout_secs: None,
        };
        modifier(&mut config);

        ensure_admin_token(metadata.as_ref(), &config.admin)
            .await
            .expect("Failed to bootstrap admin token");

        let state = AppState::new(config, metadata);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            sqlite,
            _temp_dir: temp_dir,
        }
    }

    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// Send a request and decode the JSON response (`Null` when empty).
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Send a request with the bootstrap admin token.
    pub async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(method, uri, body, Some(ADMIN_TOKEN)).await
    }

    /// Create a conference and return its id.
    pub async fn create_conference(&self, slug: &str) -> i64 {
        let (status, body) = self
            .admin(
                "POST",
                "/v1/admin/conferences",
                Some(serde_json::json!({"slug": slug, "title": {"en": slug}})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create conference: {body}");
        body["id"].as_i64().unwrap()
    }

    /// Current content of a conference.
    pub async fn content(&self, conference_id: i64) -> Value {
        let (status, body) = self
            .admin(
                "GET",
                &format!("/v1/admin/conferences/{conference_id}/content"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "get content: {body}");
        body
    }
}
