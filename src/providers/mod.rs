//! Provider module for CreditChat
//!
//! Generation backends behind the [`GenerationProvider`] trait: two text
//! backends (Ollama and any OpenAI-compatible endpoint) and the image
//! backend, which synthesizes and then uploads.

pub mod base;
pub mod image;
pub mod ollama;
pub mod openai;

pub use base::{GenerationMode, GenerationProvider, Reply};
pub use image::ImageProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::ProvidersConfig;
use crate::error::{CreditChatError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Create the configured text provider
///
/// # Arguments
///
/// * `config` - Provider configuration; `text.type` selects the backend
/// * `timeout` - Per-request HTTP timeout
///
/// # Errors
///
/// Returns error if the provider type is unknown or initialization fails
pub fn create_text_provider(
    config: &ProvidersConfig,
    timeout: Duration,
) -> Result<Arc<dyn GenerationProvider>> {
    match config.text.provider_type.as_str() {
        "ollama" => Ok(Arc::new(OllamaProvider::new(
            config.text.ollama.clone(),
            timeout,
        )?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(
            config.text.openai.clone(),
            timeout,
        )?)),
        other => Err(CreditChatError::Provider(format!("Unknown provider type: {other}")).into()),
    }
}

/// The pair of providers a pipeline dispatches to
///
/// Selection happens per call through [`GenerationMode`].
#[derive(Clone)]
pub struct Providers {
    text: Arc<dyn GenerationProvider>,
    image: Arc<dyn GenerationProvider>,
}

impl Providers {
    /// Combine a text and an image provider
    pub fn new(text: Arc<dyn GenerationProvider>, image: Arc<dyn GenerationProvider>) -> Self {
        Self { text, image }
    }

    /// Build both providers from configuration
    pub fn from_config(config: &ProvidersConfig, timeout: Duration) -> Result<Self> {
        let text = create_text_provider(config, timeout)?;
        let image: Arc<dyn GenerationProvider> =
            Arc::new(ImageProvider::new(config.image.clone(), timeout)?);
        Ok(Self::new(text, image))
    }

    /// Provider serving `mode`
    pub fn for_mode(&self, mode: GenerationMode) -> &Arc<dyn GenerationProvider> {
        match mode {
            GenerationMode::Text => &self.text,
            GenerationMode::Image => &self.image,
        }
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("text", &self.text.name())
            .field("image", &self.image.name())
            .finish()
    }
}
