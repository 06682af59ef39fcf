//! Per-user preference storage in a single SQLite table.
//!
//! `preferences` is an opaque JSON document. Writes are upserts keyed by
//! `user_id`; `updated_at` is strictly increasing per user even when two
//! writes land within the clock's resolution.
//!
//! Every call opens its own connection, so the store is cheap to clone and
//! safe to use from `spawn_blocking`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::AppError;

/// Schema version stored in `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub preferences: Value,
    /// RFC 3339, microsecond precision, UTC.
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    db_path: PathBuf,
}

impl PreferenceStore {
    /// Open (and create if needed) the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(format!("prefs: cannot create {}: {e}", parent.display()))
            })?;
        }
        let store = Self { db_path: db_path.to_path_buf() };
        store.init_db()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Insert or replace the preferences for `user_id`.
    ///
    /// Saving the same document twice leaves one row; only `updated_at`
    /// moves forward.
    pub fn save(&self, user_id: &str, preferences: &Value) -> Result<UserPreferences, AppError> {
        let json = serde_json::to_string(preferences)
            .map_err(|e| AppError::Store(format!("prefs: serialize preferences: {e}")))?;

        // Take the write lock up front: a deferred read that upgrades to a
        // write cannot wait on busy_timeout under WAL.
        let mut conn = self.open_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| AppError::Store(format!("prefs: begin tx: {e}")))?;

        let previous: Option<String> = tx
            .query_row(
                "SELECT updated_at FROM user_preferences WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Store(format!("prefs: read previous timestamp: {e}")))?;

        let updated_at = next_timestamp(Utc::now(), previous.as_deref());

        tx.execute(
            "INSERT INTO user_preferences (user_id, preferences, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                preferences = excluded.preferences,
                updated_at = excluded.updated_at",
            params![user_id, json, updated_at],
        )
        .map_err(|e| AppError::Store(format!("prefs: upsert {user_id}: {e}")))?;

        tx.commit()
            .map_err(|e| AppError::Store(format!("prefs: commit save: {e}")))?;

        debug!(%user_id, %updated_at, "preferences saved");
        Ok(UserPreferences {
            user_id: user_id.to_string(),
            preferences: preferences.clone(),
            updated_at,
        })
    }

    /// `None` when the user has never saved preferences.
    pub fn get(&self, user_id: &str) -> Result<Option<UserPreferences>, AppError> {
        let conn = self.open_conn()?;
        let row = conn
            .query_row(
                "SELECT preferences, updated_at FROM user_preferences WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| AppError::Store(format!("prefs: get {user_id}: {e}")))?;

        row.map(|(json, updated_at)| {
            let preferences = serde_json::from_str(&json)
                .map_err(|e| AppError::Store(format!("prefs: decode preferences for {user_id}: {e}")))?;
            Ok(UserPreferences { user_id: user_id.to_string(), preferences, updated_at })
        })
        .transpose()
    }

    fn init_db(&self) -> Result<(), AppError> {
        let conn = self.open_conn()?;
        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .map_err(|e| AppError::Store(format!("prefs: read schema version: {e}")))?;

        if version == 0 {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS user_preferences (
                    user_id TEXT PRIMARY KEY,
                    preferences TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;
                ",
            )
            .map_err(|e| AppError::Store(format!("prefs: initialize schema: {e}")))?;
            return Ok(());
        }

        if version != SCHEMA_VERSION {
            return Err(AppError::Store(format!(
                "prefs: unsupported schema version {version}, expected {SCHEMA_VERSION}"
            )));
        }
        Ok(())
    }

    fn open_conn(&self) -> Result<Connection, AppError> {
        let conn = Connection::open(&self.db_path)
            .map_err(|e| AppError::Store(format!("prefs: open {}: {e}", self.db_path.display())))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| AppError::Store(format!("prefs: set journal_mode WAL: {e}")))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| AppError::Store(format!("prefs: set busy_timeout: {e}")))?;
        Ok(conn)
    }
}

/// `now`, or one microsecond past `previous` if the clock has not advanced.
fn next_timestamp(now: DateTime<Utc>, previous: Option<&str>) -> String {
    let floor = previous
        .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
        .map(|p| p.with_timezone(&Utc) + Duration::microseconds(1));
    let ts = match floor {
        Some(floor) if floor > now => floor,
        _ => now,
    };
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
