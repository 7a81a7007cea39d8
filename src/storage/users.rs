//! Auth collaborator boundary
//!
//! Bearer tokens are random strings handed to the user once; only their
//! SHA-256 digest is stored.

use super::{format_ts, now, storage_err, SqliteStorage, User};
use crate::error::Result;
use anyhow::Context;
use rand::distr::Alphanumeric;
use rand::Rng;
use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};

const TOKEN_LEN: usize = 48;

/// Resolves users for the generation path
pub trait UserDirectory: Send + Sync {
    /// Load a user by id
    fn find_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Resolve a bearer token to its user
    fn authenticate(&self, bearer_token: &str) -> Result<Option<User>>;
}

fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn read_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let credits: i64 = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        credits: u32::try_from(credits.max(0)).unwrap_or(u32::MAX),
    })
}

impl UserDirectory for SqliteStorage {
    fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT id, name, credits FROM users WHERE id = ?",
            params![user_id],
            read_user,
        )
        .optional()
        .context("Failed to query user")
        .map_err(|e| storage_err(e).into())
    }

    fn authenticate(&self, bearer_token: &str) -> Result<Option<User>> {
        if bearer_token.trim().is_empty() {
            return Ok(None);
        }

        let conn = self.connect()?;
        conn.query_row(
            "SELECT id, name, credits FROM users WHERE token_hash = ?",
            params![hash_token(bearer_token.trim())],
            read_user,
        )
        .optional()
        .context("Failed to query user by token")
        .map_err(|e| storage_err(e).into())
    }
}

impl SqliteStorage {
    /// Register a user and issue their bearer token
    ///
    /// Stand-in for the external registration flow. The returned token is
    /// not recoverable later.
    ///
    /// # Examples
    ///
    /// ```
    /// use creditchat::storage::{SqliteStorage, UserDirectory};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("chat.db")).unwrap();
    /// let (user, token) = storage.create_user("Alice", 10).unwrap();
    /// assert_eq!(storage.authenticate(&token).unwrap(), Some(user));
    /// ```
    pub fn create_user(&self, name: &str, credits: u32) -> Result<(User, String)> {
        let conn = self.connect()?;
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            credits,
        };
        let token = generate_token();

        conn.execute(
            "INSERT INTO users (id, name, credits, token_hash, created_at) VALUES (?, ?, ?, ?, ?)",
            params![
                user.id,
                user.name,
                i64::from(credits),
                hash_token(&token),
                format_ts(&now())
            ],
        )
        .context("Failed to insert user")
        .map_err(storage_err)?;

        tracing::info!(user_id = %user.id, "Registered user");
        Ok((user, token))
    }
}
