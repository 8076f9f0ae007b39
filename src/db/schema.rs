//! Database schema and types

pub use crate::state_machine::Session;
use chrono::{DateTime, Utc};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    user_id INTEGER PRIMARY KEY,
    session_data TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at);
";

/// Migration for databases created before `updated_at` was tracked.
/// Fails harmlessly when the column already exists.
pub const MIGRATION_ADD_UPDATED_AT: &str =
    "ALTER TABLE sessions ADD COLUMN updated_at TEXT NOT NULL DEFAULT '1970-01-01T00:00:00+00:00'";

/// A session as it was last saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub session: Session,
    pub updated_at: DateTime<Utc>,
}
