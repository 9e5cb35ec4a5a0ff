//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `events` - Event store: bounded state-change history
//! - `insights` - Insight store: persistence, lifecycle, summary
//! - `entities` - Entity snapshot metadata for classification

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::error::Result;

mod entities;
mod events;
mod insights;

pub use events::{EventStats, IngestOutcome};
pub use insights::SynthesisStats;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Timestamp storage format. Seconds precision is enough for lag bucketing
/// and sorts lexicographically.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Format a DateTime<Utc> for storage.
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
    /// Write counter driving lazy event eviction (see `db::events`).
    pub(crate) write_counter: Arc<AtomicU64>,
}

impl Database {
    /// Create a new database connection pool and run migrations.
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
            write_counter: Arc::new(AtomicU64::new(0)),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because each pooled
    /// connection would otherwise see its own empty in-memory database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("hearth_test_{}_{}.db", std::process::id(), id));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Create tables if they do not exist.
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS state_events (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_id   TEXT NOT NULL,
                old_value   TEXT NOT NULL,
                new_value   TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_entity_time
                ON state_events(entity_id, recorded_at);
            CREATE INDEX IF NOT EXISTS idx_events_time
                ON state_events(recorded_at);

            CREATE TABLE IF NOT EXISTS entities (
                entity_id     TEXT PRIMARY KEY,
                domain        TEXT NOT NULL,
                device_class  TEXT,
                friendly_name TEXT,
                updated_at    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS insights (
                id               TEXT PRIMARY KEY,
                kind             TEXT NOT NULL,
                title            TEXT NOT NULL,
                description      TEXT NOT NULL,
                confidence       REAL NOT NULL,
                primary_entity   TEXT NOT NULL,
                related_entities TEXT NOT NULL,
                suggestions      TEXT NOT NULL,
                yaml             TEXT,
                status           TEXT NOT NULL DEFAULT 'active',
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_insights_status
                ON insights(status, updated_at);

            CREATE TABLE IF NOT EXISTS engine_meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Record the completion time of the most recent scan.
    pub fn set_last_scan(&self, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO engine_meta (key, value) VALUES ('last_scan', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![format_datetime(at)],
        )?;
        Ok(())
    }

    /// Completion time of the most recent scan, if any scan has run.
    pub fn last_scan(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn()?;
        let result: rusqlite::Result<String> = conn.query_row(
            "SELECT value FROM engine_meta WHERE key = 'last_scan'",
            [],
            |row| row.get(0),
        );
        match result {
            Ok(s) => Ok(Some(parse_datetime(&s))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
