//! Unified `Database` trait: single async interface for all persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::remote::RemoteSessionRecord;

/// Backend-agnostic database trait covering settings and onboarding sessions.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Settings ────────────────────────────────────────────────────

    /// Read a JSON setting.
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or replace a JSON setting.
    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Delete a setting. Returns whether a row was removed.
    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError>;

    // ── Onboarding sessions ─────────────────────────────────────────

    /// Ensure a session row exists, creating it if needed.
    async fn ensure_onboarding_session(&self, session_id: Uuid) -> Result<(), DatabaseError>;

    /// Store (or replace) one step's data. The session must exist.
    async fn upsert_onboarding_step(
        &self,
        session_id: Uuid,
        step_key: &str,
        data: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Record the registered user and mark the session complete.
    async fn complete_onboarding_session(
        &self,
        session_id: Uuid,
        user_id: &str,
    ) -> Result<(), DatabaseError>;

    /// Fetch a session with all of its step data.
    async fn get_onboarding_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<RemoteSessionRecord>, DatabaseError>;

    /// Delete a session and its steps. Returns whether it existed.
    async fn delete_onboarding_session(&self, session_id: Uuid) -> Result<bool, DatabaseError>;
}
