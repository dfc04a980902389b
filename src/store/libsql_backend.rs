//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::remote::RemoteSessionRecord;
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_ref().map(|s| parse_datetime(s))
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Settings ────────────────────────────────────────────────────

    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT value FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value_str: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;
                let value = serde_json::from_str(&value_str)
                    .map_err(|e| DatabaseError::Serialization(format!("setting '{key}': {e}")))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let value_str = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO settings (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![user_id, key, value_str, now],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;

        Ok(())
    }

    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute(
                "DELETE FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_setting: {e}")))?;
        Ok(count > 0)
    }

    // ── Onboarding sessions ─────────────────────────────────────────

    async fn ensure_onboarding_session(&self, session_id: Uuid) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO onboarding_sessions (id, created_at, updated_at) VALUES (?1, ?2, ?2)
                 ON CONFLICT (id) DO NOTHING",
                params![session_id.to_string(), now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("ensure_onboarding_session: {e}")))?;
        Ok(())
    }

    async fn upsert_onboarding_step(
        &self,
        session_id: Uuid,
        step_key: &str,
        data: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let id = session_id.to_string();
        let data_str =
            serde_json::to_string(data).map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        let tx = conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_onboarding_step: {e}")))?;
        let touched = tx
            .execute(
                "UPDATE onboarding_sessions SET updated_at = ?2 WHERE id = ?1",
                params![id.clone(), now.clone()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_onboarding_step: {e}")))?;
        if touched == 0 {
            return Err(DatabaseError::NotFound {
                entity: "onboarding_session".to_string(),
                id,
            });
        }

        tx.execute(
            "INSERT INTO onboarding_steps (session_id, step_key, data, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (session_id, step_key) DO UPDATE SET data = ?3, updated_at = ?4",
            params![id, step_key, data_str, now],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("upsert_onboarding_step: {e}")))?;
        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_onboarding_step commit: {e}")))?;

        debug!(%session_id, step_key, "Stored onboarding step");
        Ok(())
    }

    async fn complete_onboarding_session(
        &self,
        session_id: Uuid,
        user_id: &str,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let id = session_id.to_string();
        let count = self
            .conn()
            .execute(
                "UPDATE onboarding_sessions
                 SET user_id = ?2, completed_at = ?3, updated_at = ?3
                 WHERE id = ?1",
                params![id.clone(), user_id, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("complete_onboarding_session: {e}")))?;
        if count == 0 {
            return Err(DatabaseError::NotFound {
                entity: "onboarding_session".to_string(),
                id,
            });
        }
        Ok(())
    }

    async fn get_onboarding_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<RemoteSessionRecord>, DatabaseError> {
        let conn = self.conn();
        let id = session_id.to_string();

        let mut rows = conn
            .query(
                "SELECT user_id, created_at, updated_at, completed_at
                 FROM onboarding_sessions WHERE id = ?1",
                params![id.clone()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_onboarding_session: {e}")))?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return Err(DatabaseError::Query(format!("get_onboarding_session: {e}"))),
        };
        let read = |e: libsql::Error| DatabaseError::Query(format!("get_onboarding_session: {e}"));
        let user_id: Option<String> = row.get(0).ok();
        let created_at: String = row.get(1).map_err(read)?;
        let updated_at: String = row.get(2).map_err(read)?;
        let completed_at: Option<String> = row.get(3).ok();

        let mut step_rows = conn
            .query(
                "SELECT step_key, data FROM onboarding_steps WHERE session_id = ?1",
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_onboarding_session steps: {e}")))?;

        let mut steps = BTreeMap::new();
        while let Some(step_row) = step_rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get_onboarding_session steps: {e}")))?
        {
            let key: String = step_row.get(0).map_err(read)?;
            let data: String = step_row.get(1).map_err(read)?;
            let value = serde_json::from_str(&data)
                .map_err(|e| DatabaseError::Serialization(format!("step '{key}': {e}")))?;
            steps.insert(key, value);
        }

        Ok(Some(RemoteSessionRecord {
            session_id,
            steps,
            user_id,
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
            completed_at: parse_optional_datetime(&completed_at),
        }))
    }

    async fn delete_onboarding_session(&self, session_id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let id = session_id.to_string();
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_onboarding_session: {e}")))?;
        tx.execute(
            "DELETE FROM onboarding_steps WHERE session_id = ?1",
            params![id.clone()],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("delete_onboarding_session: {e}")))?;
        let count = tx
            .execute("DELETE FROM onboarding_sessions WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_onboarding_session: {e}")))?;
        tx.commit().await.map_err(|e| {
            DatabaseError::Query(format!("delete_onboarding_session commit: {e}"))
        })?;
        Ok(count > 0)
    }
}

impl LibSqlBackend {
    /// Number of stored onboarding sessions.
    pub async fn count_onboarding_sessions(&self) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM onboarding_sessions", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_onboarding_sessions: {e}")))?;
        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::Query(format!("count_onboarding_sessions: {e}"))),
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count_onboarding_sessions: {e}"))),
        }
    }

    /// Store a raw setting string, bypassing JSON encoding.
    #[cfg(test)]
    async fn set_raw_setting(&self, user_id: &str, key: &str, raw: &str) {
        self.conn()
            .execute(
                "INSERT INTO settings (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![user_id, key, raw, Utc::now().to_rfc3339()],
            )
            .await
            .ok();
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    // ── Settings tests ──────────────────────────────────────────────

    #[tokio::test]
    async fn setting_roundtrip() {
        let db = test_db().await;
        assert!(db.get_setting("default", "k").await.unwrap().is_none());

        db.set_setting("default", "k", &json!({"a": 1})).await.unwrap();
        db.set_setting("default", "k", &json!({"a": 2})).await.unwrap();
        assert_eq!(
            db.get_setting("default", "k").await.unwrap(),
            Some(json!({"a": 2}))
        );

        assert!(db.delete_setting("default", "k").await.unwrap());
        assert!(!db.delete_setting("default", "k").await.unwrap());
    }

    #[tokio::test]
    async fn settings_are_scoped_by_user() {
        let db = test_db().await;
        db.set_setting("alice", "k", &json!(1)).await.unwrap();
        assert!(db.get_setting("bob", "k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_setting_is_serialization_error() {
        let db = test_db().await;
        db.set_raw_setting("default", "broken", "{not json").await;
        let err = db.get_setting("default", "broken").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Serialization(_)));
    }

    // ── Onboarding session tests ────────────────────────────────────

    #[tokio::test]
    async fn session_lifecycle() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        assert!(db.get_onboarding_session(id).await.unwrap().is_none());

        db.ensure_onboarding_session(id).await.unwrap();
        db.ensure_onboarding_session(id).await.unwrap();
        db.upsert_onboarding_step(id, "businessInfo", &json!({"businessName": "Acme"}))
            .await
            .unwrap();
        db.upsert_onboarding_step(id, "businessInfo", &json!({"businessName": "Acme Co"}))
            .await
            .unwrap();
        db.upsert_onboarding_step(id, "phoneNumber", &json!({"phoneNumber": "5512345678"}))
            .await
            .unwrap();

        let record = db.get_onboarding_session(id).await.unwrap().unwrap();
        assert_eq!(record.session_id, id);
        assert_eq!(record.steps.len(), 2);
        assert_eq!(record.steps["businessInfo"]["businessName"], "Acme Co");
        assert!(!record.is_complete());

        db.complete_onboarding_session(id, "user-1").await.unwrap();
        let record = db.get_onboarding_session(id).await.unwrap().unwrap();
        assert_eq!(record.user_id.as_deref(), Some("user-1"));
        assert!(record.is_complete());
        assert!(record.updated_at >= record.created_at);

        assert_eq!(db.count_onboarding_sessions().await.unwrap(), 1);
        assert!(db.delete_onboarding_session(id).await.unwrap());
        assert!(!db.delete_onboarding_session(id).await.unwrap());
        assert!(db.get_onboarding_session(id).await.unwrap().is_none());
        assert_eq!(db.count_onboarding_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn step_for_unknown_session_is_not_found() {
        let db = test_db().await;
        let err = db
            .upsert_onboarding_step(Uuid::new_v4(), "businessInfo", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));

        let err = db
            .complete_onboarding_session(Uuid::new_v4(), "u")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn deleting_session_removes_its_steps() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        db.ensure_onboarding_session(id).await.unwrap();
        db.upsert_onboarding_step(id, "businessInfo", &json!({"businessName": "Acme"}))
            .await
            .unwrap();
        assert!(db.delete_onboarding_session(id).await.unwrap());

        // Same id again starts with no leftover step rows.
        db.ensure_onboarding_session(id).await.unwrap();
        let record = db.get_onboarding_session(id).await.unwrap().unwrap();
        assert!(record.steps.is_empty());
    }

    #[tokio::test]
    async fn rejected_step_write_leaves_no_row() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        db.upsert_onboarding_step(id, "businessInfo", &json!({}))
            .await
            .unwrap_err();

        db.ensure_onboarding_session(id).await.unwrap();
        let record = db.get_onboarding_session(id).await.unwrap().unwrap();
        assert!(record.steps.is_empty());
    }

    // ── Migration tests ─────────────────────────────────────────────

    #[tokio::test]
    async fn migrations_run_on_spawned_task() {
        let db: Arc<dyn Database> = Arc::new(test_db().await);
        tokio::spawn(async move { db.run_migrations().await })
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = test_db().await;
        // Already ran in new_memory.
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("onboarding.db");
        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.set_setting("default", "k", &json!("v")).await.unwrap();
        }
        let db = LibSqlBackend::new_local(&path).await.unwrap();
        assert_eq!(db.get_setting("default", "k").await.unwrap(), Some(json!("v")));
    }

    #[test]
    fn parses_sqlite_datetimes() {
        assert_eq!(
            parse_datetime("2026-01-02 03:04:05").to_rfc3339(),
            "2026-01-02T03:04:05+00:00"
        );
        assert_eq!(parse_datetime("garbage"), DateTime::<Utc>::MIN_UTC);
    }
}
