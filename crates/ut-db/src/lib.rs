//! Storage layer for the usage tracker.
//!
//! Provides persistence for transition events, the installed-app directory,
//! the coarse fallback-usage snapshot, and streak state using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g.,
//! `2026-03-02T10:30:00.000Z`), so lexicographic ordering matches
//! chronological ordering and range scans over the timestamp index stay
//! correct. Transition rows carry a deterministic ID derived from their
//! content; re-ingesting the same log is a no-op thanks to
//! `INSERT OR IGNORE`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use ut_core::streak::DailyEvaluationState;
use ut_core::{AppDirectory, AppId, AppInfo, ProviderError, TransitionEvent, UsageEventSource};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The store exists but the process is not allowed to read it. Maps to
    /// the provider-level authorization failure.
    #[error("access to usage store denied: {}", path.display())]
    AccessDenied { path: PathBuf },

    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for transition {id}: {timestamp}")]
    TimestampParse {
        id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Failed to parse a stored date.
    #[error("invalid stored date: {value}")]
    DateParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl From<DbError> for ProviderError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::AccessDenied { .. } => Self::AuthorizationDenied,
            other => Self::Source(Box::new(other)),
        }
    }
}

/// A transition row ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRow {
    pub id: String,
    pub app_id: String,
    pub kind: String,
    pub timestamp: String,
}

impl TransitionRow {
    /// Builds a row with a deterministic ID so re-ingestion deduplicates.
    #[must_use]
    pub fn from_event(event: &TransitionEvent) -> Self {
        let timestamp = format_timestamp(event.timestamp);
        Self {
            id: format!("transition:{}:{}:{}", event.kind, timestamp, event.app),
            app_id: event.app.to_string(),
            kind: event.kind.to_string(),
            timestamp,
        }
    }
}

/// An app-directory row ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRow {
    pub app_id: String,
    pub display_name: String,
    pub system_flagged: bool,
    pub launchable: bool,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open. A
    /// permission-denied failure surfaces as [`DbError::AccessDenied`] so
    /// callers can distinguish it from other open failures.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        match Connection::open(path) {
            Ok(conn) => {
                let db = Self { conn };
                db.init()?;
                Ok(db)
            }
            Err(err) => Err(classify_open_error(path, err)),
        }
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Transitions table: the raw platform event log
            -- timestamp: ISO 8601 format (e.g., '2026-03-02T10:30:00.000Z')
            -- kind: 'resumed' or 'paused' (legacy kinds normalized on ingest)
            CREATE TABLE IF NOT EXISTS transitions (
                id TEXT PRIMARY KEY,
                app_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transitions_timestamp ON transitions(timestamp);
            CREATE INDEX IF NOT EXISTS idx_transitions_app ON transitions(app_id);

            -- Installed-app directory used for display metadata
            CREATE TABLE IF NOT EXISTS apps (
                app_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                system_flagged INTEGER NOT NULL DEFAULT 0,
                launchable INTEGER NOT NULL DEFAULT 1
            );

            -- Coarse platform usage snapshot, consulted as a fallback
            CREATE TABLE IF NOT EXISTS fallback_usage (
                app_id TEXT PRIMARY KEY,
                foreground_ms INTEGER NOT NULL
            );

            -- Single-row streak state
            CREATE TABLE IF NOT EXISTS streak_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                current_streak INTEGER NOT NULL,
                best_streak INTEGER NOT NULL,
                last_evaluated TEXT
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of transitions, ignoring duplicates by ID.
    ///
    /// Returns the number of rows actually inserted.
    pub fn insert_transitions(&mut self, rows: &[TransitionRow]) -> Result<usize, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO transitions (id, app_id, kind, timestamp)
                VALUES (?, ?, ?, ?)
                ",
            )?;
            for row in rows {
                inserted += stmt.execute(params![row.id, row.app_id, row.kind, row.timestamp])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Lists transition rows within a time range.
    ///
    /// The range is inclusive of `start` and exclusive of `end`, ordered by
    /// timestamp then ID.
    pub fn transitions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransitionRow>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let start = format_timestamp(start);
        let end = format_timestamp(end);
        let mut stmt = self.conn.prepare(
            "
            SELECT id, app_id, kind, timestamp
            FROM transitions
            WHERE timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([start, end], |row| {
            Ok(TransitionRow {
                id: row.get(0)?,
                app_id: row.get(1)?,
                kind: row.get(2)?,
                timestamp: row.get(3)?,
            })
        })?;
        let mut transitions = Vec::new();
        for row in rows {
            transitions.push(row?);
        }
        Ok(transitions)
    }

    /// Total number of stored transitions.
    pub fn transition_count(&self) -> Result<i64, DbError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM transitions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Timestamp of the most recent stored transition, if any.
    pub fn last_transition_at(&self) -> Result<Option<String>, DbError> {
        let last = self
            .conn
            .query_row("SELECT MAX(timestamp) FROM transitions", [], |row| {
                row.get(0)
            })?;
        Ok(last)
    }

    /// Inserts or updates app-directory entries.
    pub fn upsert_apps(&mut self, rows: &[AppRow]) -> Result<usize, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO apps (app_id, display_name, system_flagged, launchable)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(app_id) DO UPDATE SET
                    display_name = excluded.display_name,
                    system_flagged = excluded.system_flagged,
                    launchable = excluded.launchable
                ",
            )?;
            for row in rows {
                written += stmt.execute(params![
                    row.app_id,
                    row.display_name,
                    i64::from(row.system_flagged),
                    i64::from(row.launchable),
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Looks up directory metadata for one app.
    pub fn app_info(&self, app_id: &str) -> Result<Option<AppInfo>, DbError> {
        let info = self
            .conn
            .query_row(
                "SELECT display_name, system_flagged, launchable FROM apps WHERE app_id = ?",
                [app_id],
                |row| {
                    Ok(AppInfo {
                        display_name: row.get(0)?,
                        system_flagged: row.get::<_, i64>(1)? != 0,
                        launchable: row.get::<_, i64>(2)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(info)
    }

    /// Number of apps in the directory.
    pub fn app_count(&self) -> Result<i64, DbError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM apps", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Replaces the coarse fallback-usage snapshot wholesale.
    ///
    /// The snapshot has no window semantics of its own, so partial updates
    /// would mix bucket generations; replacement keeps it coherent.
    pub fn replace_fallback_usage(&mut self, usage: &BTreeMap<AppId, i64>) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM fallback_usage", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO fallback_usage (app_id, foreground_ms) VALUES (?, ?)")?;
            for (app, &ms) in usage {
                stmt.execute(params![app.as_str(), ms])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Loads the coarse fallback-usage snapshot.
    ///
    /// Rows with an invalid app ID are skipped with a warning.
    pub fn fallback_usage(&self) -> Result<BTreeMap<AppId, i64>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT app_id, foreground_ms FROM fallback_usage")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut usage = BTreeMap::new();
        for row in rows {
            let (app_id, ms) = row?;
            match AppId::new(app_id) {
                Ok(app) => {
                    usage.insert(app, ms);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "skipping fallback row with invalid app ID");
                }
            }
        }
        Ok(usage)
    }

    /// Loads the persisted streak state, defaulting to an empty state.
    pub fn load_streak_state(&self) -> Result<DailyEvaluationState, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT current_streak, best_streak, last_evaluated FROM streak_state WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((current, best, last)) = row else {
            return Ok(DailyEvaluationState::default());
        };
        let last_evaluated = last
            .map(|value| {
                value
                    .parse::<NaiveDate>()
                    .map_err(|source| DbError::DateParse { value, source })
            })
            .transpose()?;

        Ok(DailyEvaluationState {
            current_streak: u32::try_from(current).unwrap_or(0),
            best_streak: u32::try_from(best).unwrap_or(0),
            last_evaluated,
        })
    }

    /// Persists the streak state.
    pub fn save_streak_state(&mut self, state: &DailyEvaluationState) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO streak_state (id, current_streak, best_streak, last_evaluated)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                current_streak = excluded.current_streak,
                best_streak = excluded.best_streak,
                last_evaluated = excluded.last_evaluated
            ",
            params![
                i64::from(state.current_streak),
                i64::from(state.best_streak),
                state.last_evaluated.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }
}

impl UsageEventSource for Database {
    /// Decodes the stored slice into domain events.
    ///
    /// Malformed rows (empty app ID, unrecognized kind, unparseable
    /// timestamp) are skipped with a warning rather than aborting the whole
    /// query; screen-time numbers degrade gracefully on partial data.
    fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TransitionEvent>, ProviderError> {
        let rows = self.transitions_in_range(from, to).map_err(ProviderError::from)?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            match decode_transition(&row) {
                Ok(event) => events.push(event),
                Err(reason) => {
                    tracing::warn!(id = %row.id, %reason, "skipping malformed transition");
                }
            }
        }
        Ok(events)
    }
}

impl AppDirectory for Database {
    fn lookup(&self, app: &AppId) -> Option<AppInfo> {
        match self.app_info(app.as_str()) {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(app = %app, error = %err, "app directory lookup failed");
                None
            }
        }
    }
}

fn decode_transition(row: &TransitionRow) -> Result<TransitionEvent, String> {
    let app = AppId::new(row.app_id.clone()).map_err(|e| e.to_string())?;
    let kind = row.kind.parse().map_err(|e: ut_core::UnknownTransitionKind| e.to_string())?;
    let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
        .map_err(|e| e.to_string())?
        .with_timezone(&Utc);
    Ok(TransitionEvent::new(app, kind, timestamp))
}

fn classify_open_error(path: &Path, err: rusqlite::Error) -> DbError {
    if let rusqlite::Error::SqliteFailure(ffi_err, _) = &err {
        let unreadable = std::fs::metadata(path).is_ok()
            && std::fs::File::open(path)
                .is_err_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied);
        if ffi_err.code == rusqlite::ErrorCode::CannotOpen && unreadable {
            return DbError::AccessDenied {
                path: path.to_path_buf(),
            };
        }
    }
    DbError::Sqlite(err)
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ut_core::TransitionKind;

    fn app(id: &str) -> AppId {
        AppId::new(id).unwrap()
    }

    fn event(id: &str, kind: TransitionKind, min: u32) -> TransitionEvent {
        TransitionEvent::new(
            app(id),
            kind,
            Utc.with_ymd_and_hms(2026, 3, 2, 10, min, 0).unwrap(),
        )
    }

    fn row(id: &str, app_id: &str, kind: &str, timestamp: &str) -> TransitionRow {
        TransitionRow {
            id: id.to_string(),
            app_id: app_id.to_string(),
            kind: kind.to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn insert_is_idempotent_by_id() {
        let mut db = Database::open_in_memory().unwrap();
        let rows: Vec<TransitionRow> = [
            event("com.a", TransitionKind::Resumed, 0),
            event("com.a", TransitionKind::Paused, 5),
        ]
        .iter()
        .map(TransitionRow::from_event)
        .collect();

        assert_eq!(db.insert_transitions(&rows).unwrap(), 2);
        // Re-ingesting the same log inserts nothing.
        assert_eq!(db.insert_transitions(&rows).unwrap(), 0);
        assert_eq!(db.transition_count().unwrap(), 2);
    }

    #[test]
    fn range_query_is_half_open_and_ordered() {
        let mut db = Database::open_in_memory().unwrap();
        let rows: Vec<TransitionRow> = [
            event("com.b", TransitionKind::Resumed, 30),
            event("com.a", TransitionKind::Resumed, 0),
            event("com.a", TransitionKind::Paused, 15),
        ]
        .iter()
        .map(TransitionRow::from_event)
        .collect();
        db.insert_transitions(&rows).unwrap();

        let from = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 3, 2, 10, 30, 0).unwrap();
        let slice = db.transitions_in_range(from, to).unwrap();

        // 10:30 row excluded (half-open), remainder in timestamp order.
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].app_id, "com.a");
        assert_eq!(slice[0].kind, "resumed");
        assert_eq!(slice[1].kind, "paused");
    }

    #[test]
    fn empty_range_returns_nothing() {
        let db = Database::open_in_memory().unwrap();
        let t = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        assert!(db.transitions_in_range(t, t).unwrap().is_empty());
    }

    #[test]
    fn events_between_skips_malformed_rows() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_transitions(&[
            row("good", "com.a", "resumed", "2026-03-02T10:00:00.000Z"),
            row("bad-kind", "com.a", "crashed", "2026-03-02T10:01:00.000Z"),
            // Sorts inside the range but has no offset, so RFC 3339 parsing fails.
            row("bad-ts", "com.a", "paused", "2026-03-02T10:02:00"),
            row("legacy", "com.a", "moved_to_background", "2026-03-02T10:05:00.000Z"),
        ])
        .unwrap();

        let from = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap();
        let events = db.events_between(from, to).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, TransitionKind::Resumed);
        // Legacy kind string normalized on decode.
        assert_eq!(events[1].kind, TransitionKind::Paused);
    }

    #[test]
    fn app_directory_roundtrip() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_apps(&[
            AppRow {
                app_id: "com.mail".to_string(),
                display_name: "Mail".to_string(),
                system_flagged: false,
                launchable: true,
            },
            AppRow {
                app_id: "com.sys".to_string(),
                display_name: "Config Provider".to_string(),
                system_flagged: true,
                launchable: false,
            },
        ])
        .unwrap();

        let mail = db.lookup(&app("com.mail")).unwrap();
        assert_eq!(mail.display_name, "Mail");
        assert!(!mail.is_true_system());

        let sys = db.lookup(&app("com.sys")).unwrap();
        assert!(sys.is_true_system());

        assert!(db.lookup(&app("com.gone")).is_none());
        assert_eq!(db.app_count().unwrap(), 2);
    }

    #[test]
    fn upsert_overwrites_existing_app() {
        let mut db = Database::open_in_memory().unwrap();
        let mut entry = AppRow {
            app_id: "com.mail".to_string(),
            display_name: "Mail".to_string(),
            system_flagged: false,
            launchable: true,
        };
        db.upsert_apps(std::slice::from_ref(&entry)).unwrap();

        entry.display_name = "Mail Pro".to_string();
        db.upsert_apps(&[entry]).unwrap();

        assert_eq!(db.app_count().unwrap(), 1);
        assert_eq!(db.lookup(&app("com.mail")).unwrap().display_name, "Mail Pro");
    }

    #[test]
    fn fallback_snapshot_replaces_wholesale() {
        let mut db = Database::open_in_memory().unwrap();
        let mut first = BTreeMap::new();
        first.insert(app("com.a"), 60_000);
        first.insert(app("com.b"), 120_000);
        db.replace_fallback_usage(&first).unwrap();

        let mut second = BTreeMap::new();
        second.insert(app("com.c"), 30_000);
        db.replace_fallback_usage(&second).unwrap();

        let stored = db.fallback_usage().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[&app("com.c")], 30_000);
    }

    #[test]
    fn streak_state_roundtrip() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(
            db.load_streak_state().unwrap(),
            DailyEvaluationState::default()
        );

        let state = DailyEvaluationState {
            current_streak: 3,
            best_streak: 7,
            last_evaluated: NaiveDate::from_ymd_opt(2026, 3, 2),
        };
        db.save_streak_state(&state).unwrap();
        assert_eq!(db.load_streak_state().unwrap(), state);

        // Saving again overwrites the single row.
        let next = DailyEvaluationState {
            current_streak: 4,
            best_streak: 7,
            last_evaluated: NaiveDate::from_ymd_opt(2026, 3, 3),
        };
        db.save_streak_state(&next).unwrap();
        assert_eq!(db.load_streak_state().unwrap(), next);
    }

    #[test]
    fn open_creates_file_database() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ut.db");
        let mut db = Database::open(&path).unwrap();
        db.insert_transitions(&[TransitionRow::from_event(&event(
            "com.a",
            TransitionKind::Resumed,
            0,
        ))])
        .unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.transition_count().unwrap(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_store_maps_to_access_denied() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ut.db");
        drop(Database::open(&path).unwrap());

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();
        let still_readable = std::fs::File::open(&path).is_ok();
        let result = Database::open(&path);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        if still_readable {
            // Privileged processes ignore permission bits; nothing to assert.
            return;
        }
        match result {
            Err(DbError::AccessDenied { .. }) => {}
            other => panic!("expected AccessDenied, got {other:?}"),
        }
    }
}
