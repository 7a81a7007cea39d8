use async_trait::async_trait;
use creditchat::error::ProviderError;
use creditchat::pipeline::GenerationPipeline;
use creditchat::providers::{GenerationProvider, Providers, Reply};
use creditchat::storage::{Chat, ChatStore, SqliteStorage, User};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Barrier;

#[allow(dead_code)]
pub fn create_temp_storage() -> (Arc<SqliteStorage>, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("creditchat.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (Arc::new(storage), tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Register a user and give them one empty chat
#[allow(dead_code)]
pub fn seed_user(storage: &SqliteStorage, name: &str, credits: u32) -> (User, Chat, String) {
    let (user, token) = storage
        .create_user(name, credits)
        .expect("failed to create user");
    let chat = storage
        .create(&user.id, &user.name)
        .expect("failed to create chat");
    (user, chat, token)
}

/// Provider that always answers with the same content
#[allow(dead_code)]
pub struct StaticProvider {
    content: String,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StaticProvider {
    pub fn new(content: &str) -> Arc<Self> {
        Arc::new(Self {
            content: content.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for StaticProvider {
    async fn generate(&self, _prompt: &str) -> Result<Reply, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Reply::new(self.content.clone()))
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Provider that holds every call until `parties` calls are in flight
#[allow(dead_code)]
pub struct BarrierProvider {
    barrier: Barrier,
}

#[allow(dead_code)]
impl BarrierProvider {
    pub fn new(parties: usize) -> Arc<Self> {
        Arc::new(Self {
            barrier: Barrier::new(parties),
        })
    }
}

#[async_trait]
impl GenerationProvider for BarrierProvider {
    async fn generate(&self, prompt: &str) -> Result<Reply, ProviderError> {
        self.barrier.wait().await;
        Ok(Reply::new(format!("echo: {prompt}")))
    }

    fn name(&self) -> &str {
        "barrier"
    }
}

/// Pipeline over one SQLite storage with the given providers
#[allow(dead_code)]
pub fn pipeline_with(
    storage: &Arc<SqliteStorage>,
    text: Arc<dyn GenerationProvider>,
    image: Arc<dyn GenerationProvider>,
) -> GenerationPipeline {
    GenerationPipeline::new(
        storage.clone(),
        storage.clone(),
        storage.clone(),
        Providers::new(text, image),
        Duration::from_secs(5),
    )
}
