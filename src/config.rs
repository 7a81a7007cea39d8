//! Configuration management for CreditChat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{CreditChatError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for CreditChat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Database location
    #[serde(default)]
    pub storage: StorageConfig,
    /// Generation pipeline settings
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Text and image provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Interactive client settings
    #[serde(default)]
    pub client: ClientConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file path; the platform data directory is used when unset
    #[serde(default)]
    pub db_path: Option<String>,
}

/// Generation pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound for one provider call, including both image round trips
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

impl GenerationConfig {
    /// Provider timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Text provider settings
    #[serde(default)]
    pub text: TextProviderConfig,
    /// Image provider settings
    #[serde(default)]
    pub image: ImageConfig,
}

/// Text provider configuration
///
/// Specifies which text backend to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextProviderConfig {
    /// Type of provider to use ("ollama" or "openai")
    #[serde(rename = "type", default = "default_text_provider")]
    pub provider_type: String,

    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// OpenAI-compatible configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
}

fn default_text_provider() -> String {
    "ollama".to_string()
}

impl Default for TextProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_text_provider(),
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model to use for Ollama
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:latest".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL; `/chat/completions` is appended
    #[serde(default = "default_openai_base")]
    pub api_base: String,

    /// Bearer key, usually supplied through `CREDITCHAT_OPENAI_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_openai_model")]
    pub model: String,
}

fn default_openai_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_openai_model() -> String {
    "gemini-2.0-flash".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_base(),
            api_key: None,
            model: default_openai_model(),
        }
    }
}

/// Image provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Base URL of the prompt-addressed synthesis service
    #[serde(default = "default_image_endpoint")]
    pub endpoint: String,

    /// Media library upload endpoint
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Upload credential, usually supplied through `CREDITCHAT_IMAGE_PRIVATE_KEY`
    #[serde(default)]
    pub private_key: Option<String>,

    /// Folder for synthesized and uploaded files
    #[serde(default = "default_image_folder")]
    pub folder: String,

    /// Requested width in pixels
    #[serde(default = "default_image_size")]
    pub width: u32,

    /// Requested height in pixels
    #[serde(default = "default_image_size")]
    pub height: u32,
}

fn default_image_endpoint() -> String {
    "https://ik.imagekit.io/creditchat".to_string()
}

fn default_upload_url() -> String {
    "https://upload.imagekit.io/api/v1/files/upload".to_string()
}

fn default_image_folder() -> String {
    "creditchat".to_string()
}

fn default_image_size() -> u32 {
    800
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_image_endpoint(),
            upload_url: default_upload_url(),
            private_key: None,
            folder: default_image_folder(),
            width: default_image_size(),
            height: default_image_size(),
        }
    }
}

/// Interactive client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the CreditChat server
    #[serde(default = "default_server_url")]
    pub server_url: String,
}

fn default_server_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CreditChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CreditChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(bind) = std::env::var("CREDITCHAT_BIND") {
            self.server.bind = bind;
        }

        if let Ok(provider_type) = std::env::var("CREDITCHAT_TEXT_PROVIDER") {
            self.providers.text.provider_type = provider_type;
        }
        if let Ok(host) = std::env::var("CREDITCHAT_OLLAMA_HOST") {
            self.providers.text.ollama.host = host;
        }
        if let Ok(model) = std::env::var("CREDITCHAT_OLLAMA_MODEL") {
            self.providers.text.ollama.model = model;
        }
        if let Ok(base) = std::env::var("CREDITCHAT_OPENAI_API_BASE") {
            self.providers.text.openai.api_base = base;
        }
        if let Ok(key) = std::env::var("CREDITCHAT_OPENAI_API_KEY") {
            self.providers.text.openai.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("CREDITCHAT_OPENAI_MODEL") {
            self.providers.text.openai.model = model;
        }

        if let Ok(endpoint) = std::env::var("CREDITCHAT_IMAGE_ENDPOINT") {
            self.providers.image.endpoint = endpoint;
        }
        if let Ok(upload_url) = std::env::var("CREDITCHAT_IMAGE_UPLOAD_URL") {
            self.providers.image.upload_url = upload_url;
        }
        if let Ok(key) = std::env::var("CREDITCHAT_IMAGE_PRIVATE_KEY") {
            self.providers.image.private_key = Some(key);
        }

        if let Ok(timeout) = std::env::var("CREDITCHAT_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(value) => self.generation.timeout_seconds = value,
                Err(_) => tracing::warn!("Ignoring invalid CREDITCHAT_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        if let Ok(server_url) = std::env::var("CREDITCHAT_SERVER_URL") {
            self.client.server_url = server_url;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(path) = &cli.storage_path {
            self.storage.db_path = Some(path.clone());
        }

        match &cli.command {
            crate::cli::Commands::Serve { bind: Some(bind) } => {
                self.server.bind = bind.clone();
            }
            crate::cli::Commands::Chat {
                server: Some(server),
            } => {
                self.client.server_url = server.clone();
            }
            _ => {}
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.server.bind.trim().is_empty() {
            return Err(CreditChatError::Config("server.bind cannot be empty".to_string()).into());
        }

        let valid_providers = ["ollama", "openai"];
        if !valid_providers.contains(&self.providers.text.provider_type.as_str()) {
            return Err(CreditChatError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.providers.text.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if self.generation.timeout_seconds == 0 {
            return Err(CreditChatError::Config(
                "generation.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.providers.image.endpoint.trim().is_empty() {
            return Err(CreditChatError::Config(
                "providers.image.endpoint cannot be empty".to_string(),
            )
            .into());
        }

        if self.providers.image.width == 0 || self.providers.image.height == 0 {
            return Err(CreditChatError::Config(
                "providers.image width and height must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
