//! Durable state for CreditChat
//!
//! A single SQLite file holds two tables: `users` (identity, display name,
//! credit balance, token hash) and `chats` (one row per chat, the ordered
//! message log kept as a JSON array). Each operation opens its own
//! connection and touches exactly one row inside one transaction, so
//! operations are individually atomic but never combined with each other.
//!
//! The pipeline talks to this module through three traits so that tests can
//! substitute failing implementations:
//!
//! - [`ChatStore`]: owner-scoped chat documents
//! - [`Ledger`]: credit check and debit
//! - [`UserDirectory`]: the auth collaborator boundary

use crate::error::{CreditChatError, Result};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use directories::ProjectDirs;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod chats;
pub mod ledger;
pub mod types;
pub mod users;

pub use chats::ChatStore;
pub use ledger::{Ledger, Reservation};
pub use types::{Chat, ChatSummary, Message, Role, User, DEFAULT_CHAT_TITLE};
pub use users::UserDirectory;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed implementation of every storage trait
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a storage instance in the platform data directory
    ///
    /// The `CREDITCHAT_DB` environment variable overrides the location.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("CREDITCHAT_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "creditchat", "creditchat")
            .ok_or_else(|| CreditChatError::Storage("Could not determine data directory".into()))?;

        Self::new_with_path(proj_dirs.data_dir().join("creditchat.db"))
    }

    /// Create a storage instance that uses the specified database path
    ///
    /// Parent directories are created as needed and the schema is
    /// initialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use creditchat::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("chat.db")).unwrap();
    /// assert!(storage.db_path().exists());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create parent directory for database")
                    .map_err(storage_err)?;
            }
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Location of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn init(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                credits INTEGER NOT NULL DEFAULT 0 CHECK (credits >= 0),
                token_hash TEXT UNIQUE,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                owner_name TEXT NOT NULL,
                title TEXT NOT NULL,
                messages JSON NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chats_owner_updated
                ON chats (owner_id, updated_at DESC);",
        )
        .context("Failed to create tables")
        .map_err(storage_err)?;

        Ok(())
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(storage_err)?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to configure busy timeout")
            .map_err(storage_err)?;
        Ok(conn)
    }
}

/// Wrap any storage-layer failure in [`CreditChatError::Storage`]
pub(crate) fn storage_err(e: impl std::fmt::Display) -> CreditChatError {
    CreditChatError::Storage(e.to_string())
}

/// Current time at the precision of the timestamp columns
///
/// Values built from this compare equal after a database round trip.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| storage_err(format!("Invalid timestamp `{raw}`: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_tables() {
        let dir = tempdir().expect("failed to create tempdir");
        let storage = SqliteStorage::new_with_path(dir.path().join("chat.db")).expect("storage");
        let conn = storage.connect().expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name IN ('users', 'chats')",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("chat.db");
        SqliteStorage::new_with_path(&path).expect("first open");
        SqliteStorage::new_with_path(&path).expect("second open");
    }

    #[test]
    fn test_format_ts_orders_lexicographically() {
        let earlier = DateTime::parse_from_rfc3339("2024-01-01T09:59:59.5Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(format_ts(&earlier) < format_ts(&later));
        assert_eq!(parse_ts(&format_ts(&later)).unwrap(), later);
    }

    #[test]
    fn test_now_survives_column_round_trip() {
        let ts = now();
        assert_eq!(parse_ts(&format_ts(&ts)).unwrap(), ts);
    }

    #[test]
    #[serial]
    fn test_new_respects_env_override() {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("nested").join("creditchat.db");
        env::set_var("CREDITCHAT_DB", db_path.to_string_lossy().to_string());

        let storage = SqliteStorage::new().expect("new failed with env override");
        assert_eq!(storage.db_path(), db_path.as_path());
        assert!(db_path.parent().unwrap().exists());

        env::remove_var("CREDITCHAT_DB");
    }
}
