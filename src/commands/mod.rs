/*!
Command handlers for the CLI

- `serve`:    run the HTTP API
- `accounts`: register users and grant credits
- `images`:   publish or hide gallery images
- `login`:    save or clear the client token
- `chat`:     interactive chat client
*/

use crate::config::Config;
use crate::error::Result;
use crate::storage::SqliteStorage;

pub mod accounts;
pub mod chat;
pub mod images;
pub mod login;
pub mod serve;
pub mod special_commands;

/// Open the database named by the configuration
///
/// Falls back to the platform data directory (or `CREDITCHAT_DB`) when no
/// path is configured.
pub fn open_storage(config: &Config) -> Result<SqliteStorage> {
    match &config.storage.db_path {
        Some(path) => SqliteStorage::new_with_path(path),
        None => SqliteStorage::new(),
    }
}
