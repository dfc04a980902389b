//! Error types for wa-onboarding.

use crate::onboarding::step::OnboardingStep;

pub use crate::validation::{FieldError, ValidationErrors};

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failures of the remote session API.
///
/// Always recoverable: the caller keeps its state and may retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteSaveError {
    #[error("{operation} was rejected: {reason}")]
    Rejected { operation: String, reason: String },

    #[error("{operation} could not reach the server: {reason}")]
    Transport { operation: String, reason: String },

    #[error("{operation} returned an invalid response: {reason}")]
    InvalidResponse { operation: String, reason: String },
}

impl RemoteSaveError {
    pub fn rejected(operation: &str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}

/// Local session persistence failures. Never fatal to the onboarding flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to read stored session: {0}")]
    Read(String),

    #[error("Failed to write session: {0}")]
    Write(String),

    #[error("Stored session is corrupted: {0}")]
    Corrupted(String),
}

impl From<DatabaseError> for PersistenceError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Serialization(msg) => Self::Corrupted(msg),
            other => Self::Write(other.to_string()),
        }
    }
}

/// Analytics delivery failures. Logged and swallowed by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("Analytics delivery failed: {0}")]
    Delivery(String),
}

/// Errors surfaced by the onboarding controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OnboardingError {
    #[error("Another onboarding operation is still in progress")]
    Busy,

    #[error("Submitted data for step {got}, but the current step is {expected}")]
    StepMismatch {
        expected: OnboardingStep,
        got: OnboardingStep,
    },

    #[error("Onboarding session is already complete")]
    AlreadyComplete,

    #[error("Price variant '{got}' does not match the session's variant '{expected}'")]
    PriceVariantMismatch { expected: String, got: String },

    #[error(transparent)]
    RemoteSave(#[from] RemoteSaveError),
}
