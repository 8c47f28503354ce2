//! SQLite-based session storage.
//!
//! Two halves share one database file:
//! - the `sessions` table: the append-only history log of completed
//!   sessions, insertion order = completion order;
//! - the `kv` table: small key-value state, including the in-flight
//!   session snapshot under [`ACTIVE_SESSION_KEY`].
//!
//! The snapshot is rewritten on every tick, so a reload resumes within one
//! tick's granularity of truth. Loading fails soft: a malformed snapshot is
//! treated as absent, never as a fatal error.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::catalog::SessionFamily;

use super::data_dir;

/// kv key holding the persisted in-flight session.
pub const ACTIVE_SESSION_KEY: &str = "active_session";

/// Durable snapshot of the session in flight.
///
/// Exactly one of `end_time` / `time_left` is authoritative at any instant,
/// selected by `is_paused`: the anchor while running, the frozen remaining
/// seconds while paused. The other field is a best-effort cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub mode_id: u32,
    pub family: SessionFamily,
    /// Absolute epoch-ms instant the countdown reaches zero. Set iff running.
    pub end_time: Option<i64>,
    /// Remaining seconds. Authoritative iff paused.
    pub time_left: u64,
    pub total_duration: u64,
    pub is_paused: bool,
    pub last_updated: i64,
    /// The day's focus-session sequence number at session start.
    pub session_count: u32,
}

/// Immutable record of a naturally completed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLogEntry {
    pub id: String,
    /// Fractional minutes, derived from exact seconds when available
    /// (90 seconds logs as 1.5).
    pub duration_minutes: f64,
    /// Completion instant, epoch milliseconds.
    pub completed_at: i64,
    pub mode_label: String,
    pub family: SessionFamily,
}

impl SessionLogEntry {
    pub fn new(duration_minutes: f64, mode_label: &str, family: SessionFamily, completed_at: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            duration_minutes,
            completed_at,
            mode_label: mode_label.to_string(),
            family,
        }
    }
}

/// SQLite database for the history log and the session snapshot.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/kairo/kairo.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir()?.join("kairo.db");
        Self::open_at(&path)
    }

    /// Open a database at an explicit path (integration tests, tooling).
    pub fn open_at(path: &std::path::Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS sessions (
                    id           TEXT PRIMARY KEY,
                    duration_min REAL NOT NULL,
                    completed_at INTEGER NOT NULL,
                    mode_label   TEXT NOT NULL DEFAULT '',
                    family       TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_sessions_completed_at_family
                    ON sessions(completed_at, family);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // ── History log ──────────────────────────────────────────────────

    /// Append a completed session. Entries are never updated afterwards.
    pub fn append_session(&self, entry: &SessionLogEntry) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (id, duration_min, completed_at, mode_label, family)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.id,
                entry.duration_minutes,
                entry.completed_at,
                entry.mode_label,
                entry.family.as_str(),
            ],
        )?;
        Ok(())
    }

    /// All entries, oldest first.
    pub fn list_all(&self) -> Result<Vec<SessionLogEntry>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, duration_min, completed_at, mode_label, family
             FROM sessions ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, duration_minutes, completed_at, mode_label, family) = row?;
            // Rows with an unknown family tag are skipped rather than faulted.
            let Some(family) = SessionFamily::parse(&family) else {
                continue;
            };
            entries.push(SessionLogEntry {
                id,
                duration_minutes,
                completed_at,
                mode_label,
                family,
            });
        }
        Ok(entries)
    }

    /// Bulk-clear the log. Explicit user action only.
    pub fn clear_all(&self) -> Result<(), DatabaseError> {
        self.conn.execute("DELETE FROM sessions", [])?;
        Ok(())
    }

    /// Number of completions for `family` at or after `epoch_ms`.
    pub fn count_since(&self, epoch_ms: i64, family: SessionFamily) -> Result<u32, DatabaseError> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE completed_at >= ?1 AND family = ?2",
            params![epoch_ms, family.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Session snapshot ─────────────────────────────────────────────

    /// Overwrite the in-flight snapshot. Last write wins.
    pub fn save_session(&self, session: &PersistedSession) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(session)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        self.kv_set(ACTIVE_SESSION_KEY, &json)
    }

    /// Load the in-flight snapshot. Malformed or partially-written snapshots
    /// are treated as absent.
    pub fn load_session(&self) -> Option<PersistedSession> {
        let json = self.kv_get(ACTIVE_SESSION_KEY).ok().flatten()?;
        serde_json::from_str(&json).ok()
    }

    /// Forget the in-flight snapshot.
    pub fn clear_session(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![ACTIVE_SESSION_KEY])?;
        Ok(())
    }

    // ── kv store ─────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Epoch milliseconds of the most recent local midnight, the day boundary
/// for session ordinals. A DST-ambiguous midnight takes the earliest
/// interpretation.
pub fn local_day_start_ms() -> i64 {
    let now = chrono::Local::now();
    now.date_naive()
        .and_time(chrono::NaiveTime::MIN)
        .and_local_timezone(chrono::Local)
        .earliest()
        .map(|t| t.timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_list_preserves_completion_order() {
        let db = Database::open_memory().unwrap();
        db.append_session(&SessionLogEntry::new(25.0, "03", SessionFamily::Focus, 1_000))
            .unwrap();
        db.append_session(&SessionLogEntry::new(5.0, "B1", SessionFamily::Break, 2_000))
            .unwrap();

        let all = db.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].mode_label, "03");
        assert_eq!(all[1].family, SessionFamily::Break);
    }

    #[test]
    fn count_since_filters_family_and_time() {
        let db = Database::open_memory().unwrap();
        db.append_session(&SessionLogEntry::new(25.0, "03", SessionFamily::Focus, 500))
            .unwrap();
        db.append_session(&SessionLogEntry::new(25.0, "03", SessionFamily::Focus, 1_500))
            .unwrap();
        db.append_session(&SessionLogEntry::new(5.0, "B1", SessionFamily::Break, 1_600))
            .unwrap();

        assert_eq!(db.count_since(1_000, SessionFamily::Focus).unwrap(), 1);
        assert_eq!(db.count_since(0, SessionFamily::Focus).unwrap(), 2);
        assert_eq!(db.count_since(0, SessionFamily::Break).unwrap(), 1);
    }

    #[test]
    fn clear_all_empties_the_log() {
        let db = Database::open_memory().unwrap();
        db.append_session(&SessionLogEntry::new(1.5, "C", SessionFamily::Focus, 10))
            .unwrap();
        db.clear_all().unwrap();
        assert!(db.list_all().unwrap().is_empty());
    }

    #[test]
    fn snapshot_round_trip() {
        let db = Database::open_memory().unwrap();
        assert!(db.load_session().is_none());

        let session = PersistedSession {
            mode_id: 3,
            family: SessionFamily::Focus,
            end_time: Some(1_700_000_100_000),
            time_left: 1400,
            total_duration: 1500,
            is_paused: false,
            last_updated: 1_700_000_000_000,
            session_count: 2,
        };
        db.save_session(&session).unwrap();

        let loaded = db.load_session().unwrap();
        assert_eq!(loaded.mode_id, 3);
        assert_eq!(loaded.end_time, Some(1_700_000_100_000));
        assert_eq!(loaded.time_left, 1400);

        db.clear_session().unwrap();
        assert!(db.load_session().is_none());
    }

    #[test]
    fn malformed_snapshot_loads_as_absent() {
        let db = Database::open_memory().unwrap();
        db.kv_set(ACTIVE_SESSION_KEY, "{not json").unwrap();
        assert!(db.load_session().is_none());

        db.kv_set(ACTIVE_SESSION_KEY, r#"{"mode_id": "wrong type"}"#)
            .unwrap();
        assert!(db.load_session().is_none());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }
}
