//! Database module
//!
//! Provides durable storage for editing sessions, one row per user.

mod schema;

pub use schema::*;

use crate::state_machine::UserId;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid session data for user {user_id}: {source}")]
    Serialization {
        user_id: i64,
        source: serde_json::Error,
    },
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;

        // Ignore error if the column already exists
        let _ = conn.execute(MIGRATION_ADD_UPDATED_AT, []);

        Ok(())
    }

    // ==================== Session Operations ====================

    /// Get the open session for a user
    pub fn get_session(&self, user_id: UserId) -> DbResult<Option<StoredSession>> {
        let conn = self.conn();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT session_data, updated_at FROM sessions WHERE user_id = ?1",
                params![user_id.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(data, updated_at)| -> DbResult<StoredSession> {
            let session: Session = serde_json::from_str(&data).map_err(|source| {
                DbError::Serialization {
                    user_id: user_id.0,
                    source,
                }
            })?;
            Ok(StoredSession {
                session,
                updated_at: parse_datetime(&updated_at),
            })
        })
        .transpose()
    }

    /// Insert or replace the session for its user
    pub fn save_session(&self, session: &Session) -> DbResult<()> {
        let data = serde_json::to_string(session).map_err(|source| DbError::Serialization {
            user_id: session.user_id.0,
            source,
        })?;
        let now = Utc::now();

        self.conn().execute(
            "INSERT OR REPLACE INTO sessions (user_id, session_data, updated_at) VALUES (?1, ?2, ?3)",
            params![session.user_id.0, data, now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Delete a user's session
    pub fn delete_session(&self, user_id: UserId) -> DbResult<()> {
        self.conn()
            .execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id.0])?;
        Ok(())
    }

    /// Delete sessions not saved since `cutoff`, returning how many were removed
    pub fn purge_sessions_older_than(&self, cutoff: DateTime<Utc>) -> DbResult<usize> {
        let conn = self.conn();
        let rows: Vec<(i64, String)> = {
            let mut stmt = conn.prepare("SELECT user_id, updated_at FROM sessions")?;
            let mapped = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            mapped.collect::<Result<_, _>>()?
        };

        // Timestamps are compared parsed; stored offsets may differ
        let stale: Vec<i64> = rows
            .into_iter()
            .filter(|(_, updated_at)| parse_datetime(updated_at) < cutoff)
            .map(|(user_id, _)| user_id)
            .collect();

        for user_id in &stale {
            conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
        }
        Ok(stale.len())
    }

    /// Delete sessions idle longer than `ttl`
    pub fn purge_expired(&self, ttl: Duration) -> DbResult<usize> {
        // A cutoff before the representable range means nothing is old enough
        match Utc::now().checked_sub_signed(ttl) {
            Some(cutoff) => self.purge_sessions_older_than(cutoff),
            None => Ok(0),
        }
    }

    /// Number of open sessions
    #[cfg(test)]
    pub fn session_count(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Store raw session JSON, bypassing serialization
    #[cfg(test)]
    pub fn insert_raw_session(&self, user_id: UserId, data: &str) -> DbResult<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO sessions (user_id, session_data, updated_at) VALUES (?1, ?2, ?3)",
            params![user_id.0, data, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    #[cfg(test)]
    fn set_updated_at(&self, user_id: UserId, at: DateTime<Utc>) -> DbResult<()> {
        self.conn().execute(
            "UPDATE sessions SET updated_at = ?1 WHERE user_id = ?2",
            params![at.to_rfc3339(), user_id.0],
        )?;
        Ok(())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
