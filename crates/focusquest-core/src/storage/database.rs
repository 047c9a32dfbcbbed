//! SQLite-based completion history and key-value state.
//!
//! Provides persistent storage for:
//! - Completed work and rest sessions with the coins they earned
//! - Totals for the stats screen
//! - Key-value store for application state (the countdown snapshot lives here)

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{CoreError, DatabaseError};
use crate::timer::{CompletedSession, SessionMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: i64,
    pub session_id: String,
    pub mode: SessionMode,
    pub total_seconds: u64,
    pub coins: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: u64,
    pub work_sessions: u64,
    pub rest_sessions: u64,
    pub total_work_seconds: u64,
    pub total_rest_seconds: u64,
    pub total_coins: u64,
}

/// SQLite database for completion history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/focusquest.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("focusquest.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and throwaway hosts).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS completed_sessions (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id    TEXT NOT NULL UNIQUE,
                mode          TEXT NOT NULL,
                total_seconds INTEGER NOT NULL,
                coins         INTEGER NOT NULL DEFAULT 0,
                started_at    TEXT NOT NULL,
                completed_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_completed_sessions_completed_at
                ON completed_sessions(completed_at);",
        )?;
        Ok(())
    }

    /// Record a completed session.
    ///
    /// A session id already present is ignored, so a completion replayed
    /// after a crash is not counted twice. Returns whether a row was added.
    pub fn record_completion(
        &self,
        completed: &CompletedSession,
        coins: u64,
    ) -> Result<bool, DatabaseError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO completed_sessions
                (session_id, mode, total_seconds, coins, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                completed.session_id.to_string(),
                completed.mode.as_str(),
                completed.total_seconds,
                coins,
                completed.started_at.to_rfc3339(),
                completed.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted == 1)
    }

    /// Most recent completions first.
    pub fn recent_completions(&self, limit: usize) -> Result<Vec<CompletionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, mode, total_seconds, coins, started_at, completed_at
             FROM completed_sessions
             ORDER BY completed_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, session_id, mode, total_seconds, coins, started_at, completed_at) = row?;
            records.push(CompletionRecord {
                id,
                session_id,
                mode: mode.parse().map_err(DatabaseError::QueryFailed)?,
                total_seconds,
                coins,
                started_at: parse_ts(&started_at)?,
                completed_at: parse_ts(&completed_at)?,
            });
        }
        Ok(records)
    }

    pub fn stats(&self) -> Result<Stats, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT mode, COUNT(*), COALESCE(SUM(total_seconds), 0), COALESCE(SUM(coins), 0)
             FROM completed_sessions
             GROUP BY mode",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        let mut stats = Stats::default();
        for row in rows {
            let (mode, count, seconds, coins) = row?;
            stats.total_sessions += count;
            stats.total_coins += coins;
            match mode.as_str() {
                "work" => {
                    stats.work_sessions += count;
                    stats.total_work_seconds += seconds;
                }
                "rest" => {
                    stats.rest_sessions += count;
                    stats.total_rest_seconds += seconds;
                }
                _ => {}
            }
        }
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store, replacing any previous value whole.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn completed(mode: SessionMode, total_seconds: u64) -> CompletedSession {
        let now = Utc::now();
        CompletedSession {
            session_id: Uuid::new_v4(),
            mode,
            total_seconds,
            started_at: now - Duration::seconds(total_seconds as i64),
            completed_at: now,
        }
    }

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        db.record_completion(&completed(SessionMode::Work, 1500), 250)
            .unwrap();
        db.record_completion(&completed(SessionMode::Rest, 300), 0)
            .unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.work_sessions, 1);
        assert_eq!(stats.total_work_seconds, 1500);
        assert_eq!(stats.total_rest_seconds, 300);
        assert_eq!(stats.total_coins, 250);

        let recent = db.recent_completions(10).unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn replayed_completion_is_ignored() {
        let db = Database::open_memory().unwrap();
        let done = completed(SessionMode::Work, 60);
        assert!(db.record_completion(&done, 10).unwrap());
        assert!(!db.record_completion(&done, 10).unwrap());
        assert_eq!(db.stats().unwrap().total_sessions, 1);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }
}
