//! Interactive client side of CreditChat
//!
//! - [`state`]: optimistic chat state machine
//! - [`api`]: HTTP client for the server API
//!
//! The bearer token and the last opened chat are kept in the system keyring
//! between runs.

pub mod api;
pub mod state;

pub use api::ApiClient;
pub use state::{ClientSyncState, Phase, Submission, PROMPT_SAVED_NOTICE};

use crate::error::Result;
use serde::{Deserialize, Serialize};

const KEYRING_SERVICE: &str = "creditchat";
const KEYRING_USER: &str = "session";

/// Client session persisted in the system keyring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    /// Bearer token issued by `users add`
    pub token: String,
    /// Chat opened most recently
    #[serde(default)]
    pub last_chat_id: Option<String>,
}

impl SavedSession {
    /// Load the saved session, if any
    ///
    /// A missing or cleared entry yields `Ok(None)`.
    pub fn load() -> Result<Option<Self>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        let json = match entry.get_password() {
            Ok(json) => json,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if json.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Save this session
    pub fn save(&self) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        entry.set_password(&serde_json::to_string(self)?)?;
        Ok(())
    }

    /// Clear the saved session
    pub fn clear() -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        entry.set_password("")?;
        tracing::info!("Cleared saved session in keyring");
        Ok(())
    }
}
