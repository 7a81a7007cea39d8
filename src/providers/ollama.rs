//! Ollama text provider for CreditChat
//!
//! Sends the prompt as a single user message to an Ollama server's
//! `/api/chat` endpoint with streaming disabled.

use crate::config::OllamaConfig;
use crate::error::{CreditChatError, ProviderError, Result};
use crate::providers::{GenerationProvider, Reply};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama API provider
///
/// # Examples
///
/// ```
/// use creditchat::config::OllamaConfig;
/// use creditchat::providers::OllamaProvider;
/// use std::time::Duration;
///
/// let config = OllamaConfig {
///     host: "http://localhost:11434".to_string(),
///     model: "llama3.2:latest".to_string(),
/// };
/// let provider = OllamaProvider::new(config, Duration::from_secs(30)).unwrap();
/// assert_eq!(provider.model(), "llama3.2:latest");
/// ```
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

/// Request structure for Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

/// Message structure for Ollama API
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
}

/// Response structure from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
}

impl OllamaProvider {
    /// Create a new Ollama provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OllamaConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("creditchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CreditChatError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Ollama provider: host={}, model={}",
            config.host,
            config.model
        );

        Ok(Self { client, config })
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> std::result::Result<Reply, ProviderError> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));
        let request = OllamaRequest {
            model: &self.config.model,
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
        };

        tracing::debug!("Sending Ollama chat request: {}", url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to reach Ollama: {}", e);
                ProviderError::from_transport("ollama chat", &e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned error {}: {}", status, error_text);
            return Err(ProviderError::from_status("ollama chat", status, &error_text));
        }

        let body: OllamaResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Ollama response: {}", e);
            ProviderError::InvalidResponse(format!("Failed to parse Ollama response: {}", e))
        })?;

        if !body.done {
            tracing::debug!("Ollama response not marked done; using partial content");
        }

        Ok(Reply::new(body.message.content))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
