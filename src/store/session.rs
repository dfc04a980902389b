//! Local persistence of the in-progress onboarding session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::PersistenceError;
use crate::onboarding::session::OnboardingSession;
use crate::store::traits::Database;

/// Settings keys used by the session store.
pub mod settings_keys {
    /// Key for the OnboardingSession JSON blob in the settings table.
    pub const ONBOARDING_SESSION: &str = "onboarding_session";
    /// Default user ID (one session per device).
    pub const DEFAULT_USER: &str = "default";
}

/// Persistence port for the controller's session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the stored session. Data that cannot be decoded is reported as
    /// [`PersistenceError::Corrupted`].
    async fn load(&self) -> Result<Option<OnboardingSession>, PersistenceError>;

    async fn save(&self, session: &OnboardingSession) -> Result<(), PersistenceError>;

    async fn clear(&self) -> Result<(), PersistenceError>;
}

fn decode(value: Value) -> Result<OnboardingSession, PersistenceError> {
    serde_json::from_value(value).map_err(|e| PersistenceError::Corrupted(e.to_string()))
}

fn encode(session: &OnboardingSession) -> Result<Value, PersistenceError> {
    serde_json::to_value(session).map_err(|e| PersistenceError::Write(e.to_string()))
}

// ── In-memory store ─────────────────────────────────────────────────

/// Keeps the session as JSON in memory.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Value>>,
    fail_writes: AtomicBool,
    fail_clears: AtomicBool,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with arbitrary stored JSON.
    pub fn with_raw(value: Value) -> Self {
        Self {
            slot: Mutex::new(Some(value)),
            fail_writes: AtomicBool::new(false),
            fail_clears: AtomicBool::new(false),
        }
    }

    /// Make subsequent saves fail, simulating a full or read-only disk.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent clears fail.
    pub fn set_fail_clears(&self, fail: bool) {
        self.fail_clears.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self) -> Option<Value> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<OnboardingSession>, PersistenceError> {
        let raw = self
            .slot
            .lock()
            .map_err(|_| PersistenceError::Read("session slot poisoned".to_string()))?
            .clone();
        raw.map(decode).transpose()
    }

    async fn save(&self, session: &OnboardingSession) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Write("storage unavailable".to_string()));
        }
        let value = encode(session)?;
        *self
            .slot
            .lock()
            .map_err(|_| PersistenceError::Write("session slot poisoned".to_string()))? =
            Some(value);
        Ok(())
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        if self.fail_clears.load(Ordering::SeqCst) {
            return Err(PersistenceError::Write("storage unavailable".to_string()));
        }
        *self
            .slot
            .lock()
            .map_err(|_| PersistenceError::Write("session slot poisoned".to_string()))? = None;
        Ok(())
    }
}

// ── Settings-table store ────────────────────────────────────────────

/// Stores the session in the `settings` table under a fixed key.
///
/// Sessions whose `lastUpdatedAt` is older than the TTL are treated as
/// absent and removed on load.
pub struct SettingsSessionStore {
    db: Arc<dyn Database>,
    user_id: String,
    ttl: Option<Duration>,
}

impl SettingsSessionStore {
    pub fn new(db: Arc<dyn Database>, ttl: Option<Duration>) -> Self {
        Self {
            db,
            user_id: settings_keys::DEFAULT_USER.to_string(),
            ttl,
        }
    }

    /// Store on `db` using the TTL from the client configuration.
    pub fn from_config(db: Arc<dyn Database>, config: &ClientConfig) -> Self {
        Self::new(db, config.session_ttl)
    }

    /// Scope the stored session to a different settings user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    fn is_expired(&self, session: &OnboardingSession) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        let age = Utc::now().signed_duration_since(session.metadata.last_updated_at);
        age.to_std().map(|age| age > ttl).unwrap_or(false)
    }
}

#[async_trait]
impl SessionStore for SettingsSessionStore {
    async fn load(&self) -> Result<Option<OnboardingSession>, PersistenceError> {
        let value = self
            .db
            .get_setting(&self.user_id, settings_keys::ONBOARDING_SESSION)
            .await
            .map_err(|e| match PersistenceError::from(e) {
                PersistenceError::Write(msg) => PersistenceError::Read(msg),
                other => other,
            })?;
        let Some(value) = value else {
            return Ok(None);
        };

        let session = decode(value)?;
        if self.is_expired(&session) {
            tracing::info!(session_id = %session.session_id(), "Stored onboarding session expired");
            self.clear().await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn save(&self, session: &OnboardingSession) -> Result<(), PersistenceError> {
        let value = encode(session)?;
        self.db
            .set_setting(&self.user_id, settings_keys::ONBOARDING_SESSION, &value)
            .await?;
        tracing::debug!(
            session_id = %session.session_id(),
            step = session.current_step.number(),
            "Persisted onboarding session"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        self.db
            .delete_setting(&self.user_id, settings_keys::ONBOARDING_SESSION)
            .await?;
        Ok(())
    }
}
