//! Metadata store trait and implementations.

use crate::error::{MetadataError, MetadataResult};
use crate::reconcile::ReconcileError;
use crate::repos::{ConferenceRepo, ContentRepo, TokenRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: ConferenceRepo + ContentRepo + TokenRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(
        path: impl AsRef<Path>,
        query_timeout_secs: Option<u64>,
    ) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // One connection: a reconciliation holds it for the whole
            // transaction and every other request waits its turn.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        if let Some(secs) = query_timeout_secs {
            tracing::debug!(
                query_timeout_secs = secs,
                "SQLite query timeout is advisory only"
            );
        }

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn require_conference(&self, conference_id: i64) -> MetadataResult<()> {
        match self.get_conference(conference_id).await? {
            Some(_) => Ok(()),
            None => Err(MetadataError::NotFound(format!(
                "conference {conference_id}"
            ))),
        }
    }
}

/// Surface write failures inside a reconciliation as constraint errors where
/// the database says so.
fn reconcile_failure(err: ReconcileError) -> MetadataError {
    match err {
        ReconcileError::Database(e) => MetadataError::from_write(e),
        other => other.into(),
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use crate::reconcile::{
        ReconcileOptions, ReconcilePlan, load_content_state, plan, reconcile_in_transaction,
    };
    use podium_core::{ConferenceSnapshot, DiffSummary};
    use sqlx::types::Json;
    use time::OffsetDateTime;
    use tracing::{info, warn};
    use uuid::Uuid;

    #[async_trait]
    impl ConferenceRepo for SqliteStore {
        async fn create_conference(
            &self,
            conference: &NewConference,
        ) -> MetadataResult<ConferenceRow> {
            let now = OffsetDateTime::now_utc();
            let result = sqlx::query_as::<_, ConferenceRow>(
                r#"
                INSERT INTO conferences (slug, title, created_at, updated_at)
                VALUES (?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(&conference.slug)
            .bind(Json(&conference.title))
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(row) => Ok(row),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                    MetadataError::AlreadyExists(format!("conference '{}'", conference.slug)),
                ),
                Err(e) => Err(e.into()),
            }
        }

        async fn get_conference(
            &self,
            conference_id: i64,
        ) -> MetadataResult<Option<ConferenceRow>> {
            let row =
                sqlx::query_as::<_, ConferenceRow>("SELECT * FROM conferences WHERE id = ?")
                    .bind(conference_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn get_conference_by_slug(
            &self,
            slug: &str,
        ) -> MetadataResult<Option<ConferenceRow>> {
            let row =
                sqlx::query_as::<_, ConferenceRow>("SELECT * FROM conferences WHERE slug = ?")
                    .bind(slug)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn list_conferences(&self) -> MetadataResult<Vec<ConferenceRow>> {
            let rows = sqlx::query_as::<_, ConferenceRow>("SELECT * FROM conferences ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn delete_conference(&self, conference_id: i64) -> MetadataResult<()> {
            let result = sqlx::query("DELETE FROM conferences WHERE id = ?")
                .bind(conference_id)
                .execute(&self.pool)
                .await
                .map_err(MetadataError::from_write)?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!(
                    "conference {conference_id}"
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ContentRepo for SqliteStore {
        async fn load_content(&self, conference_id: i64) -> MetadataResult<ContentState> {
            self.require_conference(conference_id).await?;
            let mut conn = self.pool.acquire().await?;
            Ok(load_content_state(&mut conn, conference_id).await?)
        }

        async fn plan_content(
            &self,
            conference_id: i64,
            snapshot: &ConferenceSnapshot,
            options: ReconcileOptions,
        ) -> MetadataResult<ReconcilePlan> {
            let state = self.load_content(conference_id).await?;
            Ok(plan(snapshot, &state, options)?)
        }

        async fn reconcile_content(
            &self,
            conference_id: i64,
            snapshot: &ConferenceSnapshot,
            options: ReconcileOptions,
        ) -> MetadataResult<DiffSummary> {
            self.require_conference(conference_id).await?;

            let mut tx = self.pool.begin().await?;
            match reconcile_in_transaction(&mut tx, conference_id, snapshot, options).await {
                Ok(summary) => {
                    // Deferred foreign keys are checked here.
                    tx.commit().await.map_err(MetadataError::from_write)?;
                    info!(
                        conference_id,
                        additions = summary.total.additions,
                        modifications = summary.total.modifications,
                        deletions = summary.total.deletions,
                        "reconciliation committed"
                    );
                    Ok(summary)
                }
                Err(err) => {
                    if let Err(rollback) = tx.rollback().await {
                        warn!(conference_id, error = %rollback, "rollback failed");
                    }
                    warn!(conference_id, error = %err, "reconciliation rolled back");
                    Err(reconcile_failure(err))
                }
            }
        }
    }

    #[async_trait]
    impl TokenRepo for SqliteStore {
        async fn create_token(&self, token: &TokenRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO tokens (
                    token_id, token_hash, scopes, expires_at,
                    revoked_at, created_at, last_used_at, description
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(token.token_id)
            .bind(&token.token_hash)
            .bind(&token.scopes)
            .bind(token.expires_at)
            .bind(token.revoked_at)
            .bind(token.created_at)
            .bind(token.last_used_at)
            .bind(&token.description)
            .execute(&self.pool)
            .await
            .map_err(MetadataError::from_write)?;
            Ok(())
        }

        async fn get_token_by_hash(&self, token_hash: &str) -> MetadataResult<Option<TokenRow>> {
            let row = sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens WHERE token_hash = ?")
                .bind(token_hash)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_token(&self, token_id: Uuid) -> MetadataResult<Option<TokenRow>> {
            let row = sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens WHERE token_id = ?")
                .bind(token_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn touch_token(&self, token_id: Uuid, used_at: OffsetDateTime) -> MetadataResult<()> {
            sqlx::query("UPDATE tokens SET last_used_at = ? WHERE token_id = ?")
                .bind(used_at)
                .bind(token_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn revoke_token(
            &self,
            token_id: Uuid,
            revoked_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            let result = sqlx::query(
                "UPDATE tokens SET revoked_at = COALESCE(revoked_at, ?) WHERE token_id = ?",
            )
            .bind(revoked_at)
            .bind(token_id)
            .execute(&self.pool)
            .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("token {token_id}")));
            }
            Ok(())
        }

        async fn list_tokens(&self) -> MetadataResult<Vec<TokenRow>> {
            let rows =
                sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?;
            Ok(rows)
        }

        async fn get_admin_token_id(&self) -> MetadataResult<Option<Uuid>> {
            let value: Option<Option<String>> =
                sqlx::query_scalar("SELECT token_id FROM admin_token_state WHERE id = 1")
                    .fetch_optional(&self.pool)
                    .await?;
            value
                .flatten()
                .filter(|id| !id.is_empty())
                .map(|id| {
                    Uuid::parse_str(&id).map_err(|e| {
                        MetadataError::Internal(format!("invalid admin token id '{id}': {e}"))
                    })
                })
                .transpose()
        }

        async fn set_admin_token_id(&self, token_id: Uuid) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO admin_token_state (id, token_id)
                VALUES (1, ?)
                ON CONFLICT(id) DO UPDATE
                SET token_id = excluded.token_id
                "#,
            )
            .bind(token_id.to_string())
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }
}

/// SQL schema for SQLite.
///
/// Foreign keys between content tables are deferred to commit so a row can be
/// moved to a new parent in the same transaction that deletes its old one.
/// Join rows and everything owned by a conference cascade.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS conferences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS taxonomies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conference_id INTEGER NOT NULL REFERENCES conferences(id) ON DELETE CASCADE,
    correlation_ref TEXT,
    title TEXT NOT NULL,
    icon TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_taxonomies_ref
    ON taxonomies(conference_id, correlation_ref) WHERE correlation_ref IS NOT NULL;

CREATE TABLE IF NOT EXISTS labels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conference_id INTEGER NOT NULL REFERENCES conferences(id) ON DELETE CASCADE,
    correlation_ref TEXT,
    taxonomy_id INTEGER NOT NULL
        REFERENCES taxonomies(id) DEFERRABLE INITIALLY DEFERRED,
    title TEXT NOT NULL,
    icon TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_labels_ref
    ON labels(conference_id, correlation_ref) WHERE correlation_ref IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_labels_taxonomy ON labels(taxonomy_id);

CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conference_id INTEGER NOT NULL REFERENCES conferences(id) ON DELETE CASCADE,
    correlation_ref TEXT,
    name TEXT NOT NULL,
    subtitle TEXT NOT NULL,
    bio TEXT NOT NULL,
    avatar TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_people_ref
    ON people(conference_id, correlation_ref) WHERE correlation_ref IS NOT NULL;

CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conference_id INTEGER NOT NULL REFERENCES conferences(id) ON DELETE CASCADE,
    correlation_ref TEXT,
    kind TEXT NOT NULL,
    slug TEXT,
    title TEXT NOT NULL,
    details TEXT NOT NULL,
    start_date TEXT,
    end_date TEXT,
    location TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_ref
    ON sessions(conference_id, correlation_ref) WHERE correlation_ref IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(conference_id, start_date);

CREATE TABLE IF NOT EXISTS session_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conference_id INTEGER NOT NULL REFERENCES conferences(id) ON DELETE CASCADE,
    correlation_ref TEXT,
    session_id INTEGER NOT NULL
        REFERENCES sessions(id) DEFERRABLE INITIALLY DEFERRED,
    kind TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_session_links_ref
    ON session_links(conference_id, correlation_ref) WHERE correlation_ref IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_session_links_session ON session_links(session_id);

CREATE TABLE IF NOT EXISTS session_labels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    label_id INTEGER NOT NULL REFERENCES labels(id) ON DELETE CASCADE,
    UNIQUE(session_id, label_id)
);
CREATE INDEX IF NOT EXISTS idx_session_labels_label ON session_labels(label_id);

CREATE TABLE IF NOT EXISTS session_people (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    person_id INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
    UNIQUE(session_id, person_id)
);
CREATE INDEX IF NOT EXISTS idx_session_people_person ON session_people(person_id);

CREATE TABLE IF NOT EXISTS tokens (
    token_id BLOB PRIMARY KEY,
    token_hash TEXT NOT NULL UNIQUE,
    scopes TEXT NOT NULL,
    expires_at TEXT,
    revoked_at TEXT,
    created_at TEXT NOT NULL,
    last_used_at TEXT,
    description TEXT
);

CREATE TABLE IF NOT EXISTS admin_token_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    token_id TEXT
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewConference, TaxonomyRow, TokenRow};
    use crate::reconcile::{Phases, ReconcileOptions, Table, perform_diff};
    use podium_core::diff::{Differential, Modification};
    use podium_core::resources::{
        ConferenceSnapshot, Localised, StagedLabel, StagedPerson, StagedSession,
        StagedSessionLabel, StagedSessionLink, StagedSessionPerson, StagedTaxonomy,
    };
    use podium_core::summary::DiffCounts;
    use podium_core::ResourceKind;
    use tempfile::TempDir;
    use time::OffsetDateTime;
    use uuid::Uuid;

    async fn test_store() -> (SqliteStore, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("podium.db"), None)
            .await
            .unwrap();
        (store, temp_dir)
    }

    async fn conference(store: &SqliteStore) -> i64 {
        store
            .create_conference(&NewConference {
                slug: "deconf-2026".to_string(),
                title: text("DeConf 2026"),
            })
            .await
            .unwrap()
            .id
    }

    fn text(value: &str) -> Localised {
        Localised::from([("en".to_string(), value.to_string())])
    }

    fn taxonomy(id: &str, title: &str) -> StagedTaxonomy {
        StagedTaxonomy {
            id: id.to_string(),
            title: text(title),
            icon: None,
        }
    }

    fn label(id: &str, taxonomy_id: &str) -> StagedLabel {
        StagedLabel {
            id: id.to_string(),
            taxonomy_id: taxonomy_id.to_string(),
            title: text(id),
            icon: None,
        }
    }

    fn person(id: &str) -> StagedPerson {
        StagedPerson {
            id: id.to_string(),
            name: format!("Person {id}"),
            subtitle: Localised::new(),
            bio: Localised::new(),
            avatar: None,
        }
    }

    fn session(id: &str) -> StagedSession {
        StagedSession {
            id: id.to_string(),
            kind: "session".to_string(),
            slug: None,
            title: text(id),
            details: Localised::new(),
            start_date: None,
            end_date: None,
            location: None,
        }
    }

    fn link(id: &str, session_id: &str) -> StagedSessionLink {
        StagedSessionLink {
            id: id.to_string(),
            session_id: session_id.to_string(),
            kind: "slides".to_string(),
            url: format!("https://example.org/{id}"),
            title: Localised::new(),
        }
    }

    fn speaker(id: &str, session_id: &str, person_id: &str) -> StagedSessionPerson {
        StagedSessionPerson {
            id: id.to_string(),
            session_id: session_id.to_string(),
            person_id: person_id.to_string(),
        }
    }

    fn tagged(id: &str, session_id: &str, label_id: &str) -> StagedSessionLabel {
        StagedSessionLabel {
            id: id.to_string(),
            session_id: session_id.to_string(),
            label_id: label_id.to_string(),
        }
    }

    fn theme_snapshot() -> ConferenceSnapshot {
        ConferenceSnapshot {
            taxonomies: Some(vec![taxonomy("t1", "Theme")]),
            labels: Some(vec![label("l1", "t1")]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_label_references_the_new_taxonomy_id() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;

        let summary = store
            .reconcile_content(conference_id, &theme_snapshot(), ReconcileOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.resources["taxonomies"].additions, 1);
        assert_eq!(summary.resources["labels"].additions, 1);

        let state = store.load_content(conference_id).await.unwrap();
        assert_eq!(state.taxonomies.len(), 1);
        assert_eq!(state.labels.len(), 1);
        assert_eq!(state.labels[0].taxonomy_id, state.taxonomies[0].id);
        assert_eq!(state.taxonomies[0].correlation_ref.as_deref(), Some("t1"));
        assert_eq!(state.labels[0].correlation_ref.as_deref(), Some("l1"));
    }

    #[tokio::test]
    async fn test_reconciling_twice_changes_nothing() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;
        let snapshot = ConferenceSnapshot {
            people: Some(vec![person("p1")]),
            sessions: Some(vec![session("s1")]),
            session_people: Some(vec![speaker("sp1", "s1", "p1")]),
            ..theme_snapshot()
        };

        store
            .reconcile_content(conference_id, &snapshot, ReconcileOptions::default())
            .await
            .unwrap();
        let before = store.load_content(conference_id).await.unwrap();

        let plan = store
            .plan_content(conference_id, &snapshot, ReconcileOptions::default())
            .await
            .unwrap();
        let sessions = plan.sessions.as_ref().unwrap();
        assert!(sessions.additions.is_empty());
        assert_eq!(sessions.modifications[0].target, before.sessions[0].id);
        assert!(plan.session_people.as_ref().unwrap().is_empty());

        let second = store
            .reconcile_content(conference_id, &snapshot, ReconcileOptions::default())
            .await
            .unwrap();
        assert_eq!(second.total.additions, 0);
        assert_eq!(second.total.deletions, 0);

        let after = store.load_content(conference_id).await.unwrap();
        assert_eq!(after.sessions[0].id, before.sessions[0].id);
        assert_eq!(after.session_people[0].id, before.session_people[0].id);
    }

    #[tokio::test]
    async fn test_modification_keeps_the_row_id() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;
        store
            .reconcile_content(conference_id, &theme_snapshot(), ReconcileOptions::default())
            .await
            .unwrap();
        let original = store.load_content(conference_id).await.unwrap().taxonomies[0].id;

        let renamed = ConferenceSnapshot {
            taxonomies: Some(vec![taxonomy("t1", "Track")]),
            ..Default::default()
        };
        let summary = store
            .reconcile_content(conference_id, &renamed, ReconcileOptions::default())
            .await
            .unwrap();
        assert_eq!(
            summary.resources["taxonomies"],
            DiffCounts {
                additions: 0,
                modifications: 1,
                deletions: 0,
            }
        );

        let state = store.load_content(conference_id).await.unwrap();
        assert_eq!(state.taxonomies[0].id, original);
        assert_eq!(state.taxonomies[0].title.0["en"], "Track");
        // Labels were not part of the request and still point at it.
        assert_eq!(state.labels[0].taxonomy_id, original);
    }

    #[tokio::test]
    async fn test_unresolved_join_reference_rolls_back_everything() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;
        let snapshot = ConferenceSnapshot {
            people: Some(vec![person("p1")]),
            sessions: Some(vec![session("s1")]),
            session_people: Some(vec![speaker("sp1", "s1", "ghost")]),
            ..theme_snapshot()
        };

        let err = store
            .reconcile_content(conference_id, &snapshot, ReconcileOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Reconcile(ReconcileError::UnresolvedReference {
                kind: ResourceKind::SessionPeople,
                related: ResourceKind::People,
                ..
            })
        ));

        let state = store.load_content(conference_id).await.unwrap();
        assert_eq!(state.row_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_update_target_aborts_the_transaction() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;
        store
            .reconcile_content(conference_id, &theme_snapshot(), ReconcileOptions::default())
            .await
            .unwrap();

        let diff = Differential {
            additions: vec![taxonomy("t2", "Format")],
            modifications: vec![Modification {
                target: 9_999,
                value: taxonomy("t3", "Level"),
            }],
            deletions: vec![],
        };

        let mut tx = store.pool().begin().await.unwrap();
        let result = perform_diff::<_, TaxonomyRow, _>(
            &mut tx,
            &Table::TAXONOMIES,
            &diff,
            |t: &StagedTaxonomy| {
                Ok(vec![
                    crate::reconcile::SqlValue::Integer(conference_id),
                    crate::reconcile::SqlValue::text(&t.id),
                    crate::reconcile::SqlValue::json(&t.title),
                    crate::reconcile::SqlValue::Null,
                ]
                .into())
            },
            Phases::default(),
        )
        .await;
        assert!(matches!(
            result,
            Err(ReconcileError::MissingTarget {
                table: "taxonomies",
                id: 9_999,
            })
        ));
        tx.rollback().await.unwrap();

        let state = store.load_content(conference_id).await.unwrap();
        assert_eq!(state.taxonomies.len(), 1);
        assert_eq!(state.taxonomies[0].correlation_ref.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_untracked_rows_survive_unless_requested() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;
        sqlx::query("INSERT INTO taxonomies (conference_id, title) VALUES (?, '{}')")
            .bind(conference_id)
            .execute(store.pool())
            .await
            .unwrap();

        let empty = ConferenceSnapshot {
            taxonomies: Some(vec![]),
            ..Default::default()
        };
        let summary = store
            .reconcile_content(conference_id, &empty, ReconcileOptions::default())
            .await
            .unwrap();
        assert!(summary.is_empty());
        assert_eq!(store.load_content(conference_id).await.unwrap().taxonomies.len(), 1);

        let options = ReconcileOptions {
            delete_untracked: true,
            ..Default::default()
        };
        let summary = store
            .reconcile_content(conference_id, &empty, options)
            .await
            .unwrap();
        assert_eq!(summary.total.deletions, 1);
        assert!(store.load_content(conference_id).await.unwrap().taxonomies.is_empty());
    }

    #[tokio::test]
    async fn test_label_moves_to_a_new_taxonomy_while_the_old_one_is_deleted() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;
        store
            .reconcile_content(conference_id, &theme_snapshot(), ReconcileOptions::default())
            .await
            .unwrap();
        let label_id = store.load_content(conference_id).await.unwrap().labels[0].id;

        let moved = ConferenceSnapshot {
            taxonomies: Some(vec![taxonomy("t2", "Track")]),
            labels: Some(vec![label("l1", "t2")]),
            ..Default::default()
        };
        store
            .reconcile_content(conference_id, &moved, ReconcileOptions::default())
            .await
            .unwrap();

        let state = store.load_content(conference_id).await.unwrap();
        assert_eq!(state.taxonomies.len(), 1);
        assert_eq!(state.taxonomies[0].correlation_ref.as_deref(), Some("t2"));
        assert_eq!(state.labels[0].id, label_id);
        assert_eq!(state.labels[0].taxonomy_id, state.taxonomies[0].id);
    }

    #[tokio::test]
    async fn test_orphaning_an_untracked_row_is_a_constraint_error() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;
        store
            .reconcile_content(conference_id, &theme_snapshot(), ReconcileOptions::default())
            .await
            .unwrap();
        let taxonomy_id = store.load_content(conference_id).await.unwrap().taxonomies[0].id;
        sqlx::query(
            "INSERT INTO labels (conference_id, taxonomy_id, title) VALUES (?, ?, '{}')",
        )
        .bind(conference_id)
        .bind(taxonomy_id)
        .execute(store.pool())
        .await
        .unwrap();

        // Drops t1 and l1 but the untracked label still points at t1.
        let empty = ConferenceSnapshot {
            taxonomies: Some(vec![]),
            labels: Some(vec![]),
            ..Default::default()
        };
        let err = store
            .reconcile_content(conference_id, &empty, ReconcileOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::Constraint(_)));

        let state = store.load_content(conference_id).await.unwrap();
        assert_eq!(state.taxonomies.len(), 1);
        assert_eq!(state.labels.len(), 2);
    }

    #[tokio::test]
    async fn test_join_rows_follow_their_parents() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;
        let snapshot = ConferenceSnapshot {
            people: Some(vec![person("p1"), person("p2")]),
            sessions: Some(vec![session("s1")]),
            session_labels: Some(vec![tagged("sl1", "s1", "l1")]),
            session_people: Some(vec![speaker("sp1", "s1", "p1")]),
            ..theme_snapshot()
        };
        store
            .reconcile_content(conference_id, &snapshot, ReconcileOptions::default())
            .await
            .unwrap();

        // Swap the speaker; the label assignment is untouched.
        let swapped = ConferenceSnapshot {
            session_people: Some(vec![speaker("sp1", "s1", "p2")]),
            ..snapshot
        };
        let summary = store
            .reconcile_content(conference_id, &swapped, ReconcileOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.resources["session_people"].additions, 1);
        assert_eq!(summary.resources["session_people"].deletions, 1);
        assert_eq!(summary.resources["session_labels"].changes(), 0);

        let state = store.load_content(conference_id).await.unwrap();
        let p2 = state
            .people
            .iter()
            .find(|p| p.correlation_ref.as_deref() == Some("p2"))
            .unwrap();
        assert_eq!(state.session_people.len(), 1);
        assert_eq!(state.session_people[0].person_id, p2.id);
        assert_eq!(state.session_people[0].session_id, state.sessions[0].id);
        assert_eq!(state.session_labels[0].label_id, state.labels[0].id);
    }

    #[tokio::test]
    async fn test_schedule_only_request_resolves_existing_labels() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;
        store
            .reconcile_content(conference_id, &theme_snapshot(), ReconcileOptions::default())
            .await
            .unwrap();

        let schedule = ConferenceSnapshot {
            sessions: Some(vec![session("s1")]),
            session_labels: Some(vec![tagged("sl1", "s1", "l1")]),
            ..Default::default()
        };
        store
            .reconcile_content(conference_id, &schedule, ReconcileOptions::default())
            .await
            .unwrap();

        let state = store.load_content(conference_id).await.unwrap();
        assert_eq!(state.session_labels.len(), 1);
        assert_eq!(state.session_labels[0].label_id, state.labels[0].id);
    }

    #[tokio::test]
    async fn test_large_batches_pair_ids_with_their_records() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;
        let count = crate::reconcile::MAX_BATCH_ROWS + 150;
        let snapshot = ConferenceSnapshot {
            sessions: Some((0..count).map(|i| session(&format!("s{i}"))).collect()),
            session_links: Some(
                (0..count)
                    .map(|i| link(&format!("k{i}"), &format!("s{i}")))
                    .collect(),
            ),
            ..Default::default()
        };

        let summary = store
            .reconcile_content(conference_id, &snapshot, ReconcileOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.total.additions, 2 * count as u64);

        let state = store.load_content(conference_id).await.unwrap();
        let session_refs: std::collections::HashMap<i64, &str> = state
            .sessions
            .iter()
            .map(|s| (s.id, s.correlation_ref.as_deref().unwrap()))
            .collect();
        for link in &state.session_links {
            let link_ref = link.correlation_ref.as_deref().unwrap();
            let session_ref = session_refs[&link.session_id];
            assert_eq!(link_ref.trim_start_matches('k'), session_ref.trim_start_matches('s'));
        }
    }

    #[tokio::test]
    async fn test_dry_run_does_not_write() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;

        let plan = store
            .plan_content(conference_id, &theme_snapshot(), ReconcileOptions::default())
            .await
            .unwrap();
        assert_eq!(plan.summary().total.additions, 2);
        assert_eq!(store.load_content(conference_id).await.unwrap().row_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_conference_is_not_found() {
        let (store, _dir) = test_store().await;
        let err = store
            .reconcile_content(42, &theme_snapshot(), ReconcileOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_conference_slug_is_unique_and_delete_cascades() {
        let (store, _dir) = test_store().await;
        let conference_id = conference(&store).await;
        let duplicate = store
            .create_conference(&NewConference {
                slug: "deconf-2026".to_string(),
                title: text("Again"),
            })
            .await;
        assert!(matches!(duplicate, Err(MetadataError::AlreadyExists(_))));

        let found = store.get_conference_by_slug("deconf-2026").await.unwrap();
        assert_eq!(found.map(|row| row.id), Some(conference_id));
        assert!(store.get_conference_by_slug("missing").await.unwrap().is_none());

        store
            .reconcile_content(conference_id, &theme_snapshot(), ReconcileOptions::default())
            .await
            .unwrap();
        store.delete_conference(conference_id).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM labels")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(
            store.delete_conference(conference_id).await,
            Err(MetadataError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let (store, _dir) = test_store().await;
        let now = OffsetDateTime::now_utc();
        let token = TokenRow {
            token_id: Uuid::new_v4(),
            token_hash: "ab".repeat(32),
            scopes: r#"["conference:admin"]"#.to_string(),
            expires_at: None,
            revoked_at: None,
            created_at: now,
            last_used_at: None,
            description: Some("ci".to_string()),
        };
        store.create_token(&token).await.unwrap();

        let found = store.get_token_by_hash(&token.token_hash).await.unwrap().unwrap();
        assert_eq!(found.token_id, token.token_id);
        assert_eq!(store.list_tokens().await.unwrap().len(), 1);

        store.revoke_token(token.token_id, now).await.unwrap();
        let revoked = store.get_token(token.token_id).await.unwrap().unwrap();
        assert!(revoked.revoked_at.is_some());
        assert!(matches!(
            store.revoke_token(Uuid::new_v4(), now).await,
            Err(MetadataError::NotFound(_))
        ));

        assert_eq!(store.get_admin_token_id().await.unwrap(), None);
        store.set_admin_token_id(token.token_id).await.unwrap();
        assert_eq!(
            store.get_admin_token_id().await.unwrap(),
            Some(token.token_id)
        );
    }
}
