//! Persistence layer: libSQL-backed storage for settings, onboarding
//! sessions, and the locally persisted wizard state.

pub mod libsql_backend;
pub mod migrations;
pub mod session;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use session::{MemorySessionStore, SessionStore, SettingsSessionStore};
pub use traits::Database;
