//! Test utilities for CreditChat
//!
//! Temporary SQLite storage plus scripted stand-ins for the storage and
//! provider seams, so pipeline and server tests can inject failures at a
//! chosen step.

use crate::error::{CreditChatError, ProviderError, Result};
use crate::providers::{GenerationProvider, Providers, Reply};
use crate::storage::{
    Chat, ChatStore, ChatSummary, Ledger, Message, Reservation, SqliteStorage, User,
    UserDirectory,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a SQLite storage backed by a file inside a fresh temp dir
///
/// The returned `TempDir` must outlive the storage.
pub fn temp_storage() -> (Arc<SqliteStorage>, TempDir) {
    let dir = temp_dir();
    let storage = SqliteStorage::new_with_path(dir.path().join("creditchat.db"))
        .expect("Failed to create test storage");
    (Arc::new(storage), dir)
}

/// Register a user and create one chat for them
pub fn seed_user_with_chat(storage: &SqliteStorage, name: &str, credits: u32) -> (User, Chat, String) {
    let (user, token) = storage
        .create_user(name, credits)
        .expect("Failed to create test user");
    let chat = storage
        .create(&user.id, &user.name)
        .expect("Failed to create test chat");
    (user, chat, token)
}

/// Provider that answers from a fixed script and counts calls
pub struct ScriptedProvider {
    outcome: std::result::Result<String, ProviderError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    /// Always reply with `content`
    pub fn replying(content: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(content.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    /// Always fail with `error`
    pub fn failing(error: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(error),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    /// Reply with `content` after sleeping for `delay`
    pub fn slow(content: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(content.to_string()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn generate(&self, _prompt: &str) -> std::result::Result<Reply, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone().map(Reply::new)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Provider set using the same scripted provider for both modes
pub fn scripted_providers(provider: Arc<ScriptedProvider>) -> Providers {
    Providers::new(provider.clone(), provider)
}

/// Chat store wrapper that fails the N-th `append_message` call (1-based)
pub struct FlakyChats {
    inner: Arc<SqliteStorage>,
    fail_on_append: usize,
    appends: AtomicUsize,
}

impl FlakyChats {
    /// Wrap `inner`, failing append number `fail_on_append`
    pub fn new(inner: Arc<SqliteStorage>, fail_on_append: usize) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_on_append,
            appends: AtomicUsize::new(0),
        })
    }
}

impl ChatStore for FlakyChats {
    fn create(&self, owner_id: &str, owner_name: &str) -> Result<Chat> {
        self.inner.create(owner_id, owner_name)
    }

    fn get(&self, chat_id: &str, owner_id: &str) -> Result<Option<Chat>> {
        self.inner.get(chat_id, owner_id)
    }

    fn append_message(
        &self,
        chat_id: &str,
        owner_id: &str,
        message: Message,
    ) -> Result<Option<Message>> {
        let n = self.appends.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on_append {
            return Err(CreditChatError::Storage("disk I/O error".to_string()).into());
        }
        self.inner.append_message(chat_id, owner_id, message)
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ChatSummary>> {
        self.inner.list_by_owner(owner_id)
    }

    fn delete(&self, chat_id: &str, owner_id: &str) -> Result<bool> {
        self.inner.delete(chat_id, owner_id)
    }

    fn scan_all(&self) -> Result<Vec<Chat>> {
        self.inner.scan_all()
    }

    fn set_published(&self, chat_id: &str, message_index: usize, published: bool) -> Result<bool> {
        self.inner.set_published(chat_id, message_index, published)
    }
}

/// Ledger wrapper whose `debit` always fails and records attempts
pub struct BrokenDebitLedger {
    inner: Arc<SqliteStorage>,
    attempts: Mutex<Vec<(String, u32)>>,
}

impl BrokenDebitLedger {
    /// Wrap `inner`; `reserve` passes through
    pub fn new(inner: Arc<SqliteStorage>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            attempts: Mutex::new(Vec::new()),
        })
    }

    /// Debit attempts seen so far
    pub fn attempts(&self) -> Vec<(String, u32)> {
        self.attempts.lock().expect("attempts lock poisoned").clone()
    }
}

impl Ledger for BrokenDebitLedger {
    fn reserve(&self, user_id: &str, cost: u32) -> Result<Reservation> {
        self.inner.reserve(user_id, cost)
    }

    fn debit(&self, user_id: &str, cost: u32) -> Result<u32> {
        self.attempts
            .lock()
            .expect("attempts lock poisoned")
            .push((user_id.to_string(), cost));
        Err(CreditChatError::Storage("ledger unavailable".to_string()).into())
    }
}

/// Ledger wrapper that records debits and delegates them
pub struct RecordingLedger {
    inner: Arc<SqliteStorage>,
    debits: Mutex<Vec<u32>>,
}

impl RecordingLedger {
    /// Wrap `inner`
    pub fn new(inner: Arc<SqliteStorage>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            debits: Mutex::new(Vec::new()),
        })
    }

    /// Costs debited so far, in call order
    pub fn debits(&self) -> Vec<u32> {
        self.debits.lock().expect("debits lock poisoned").clone()
    }
}

impl Ledger for RecordingLedger {
    fn reserve(&self, user_id: &str, cost: u32) -> Result<Reservation> {
        self.inner.reserve(user_id, cost)
    }

    fn debit(&self, user_id: &str, cost: u32) -> Result<u32> {
        self.debits.lock().expect("debits lock poisoned").push(cost);
        self.inner.debit(user_id, cost)
    }
}

/// User directory that always errors
pub struct UnreachableDirectory;

impl UserDirectory for UnreachableDirectory {
    fn find_user(&self, _user_id: &str) -> Result<Option<User>> {
        Err(CreditChatError::Storage("directory offline".to_string()).into())
    }

    fn authenticate(&self, _bearer_token: &str) -> Result<Option<User>> {
        Err(CreditChatError::Storage("directory offline".to_string()).into())
    }
}
