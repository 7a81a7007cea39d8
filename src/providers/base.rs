//! Base provider trait and common types for CreditChat
//!
//! This module defines the [`GenerationProvider`] trait every generation
//! backend implements, the [`GenerationMode`] enum that selects a backend
//! per call, and the [`Reply`] they produce.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of generation requested for a turn
///
/// The mode decides both the provider that serves the call and its price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Textual chat completion
    Text,
    /// Image synthesis followed by upload
    Image,
}

impl GenerationMode {
    /// Credits charged for one successful generation in this mode
    ///
    /// # Examples
    ///
    /// ```
    /// use creditchat::providers::GenerationMode;
    ///
    /// assert_eq!(GenerationMode::Text.cost(), 1);
    /// assert_eq!(GenerationMode::Image.cost(), 2);
    /// ```
    pub fn cost(self) -> u32 {
        match self {
            Self::Text => 1,
            Self::Image => 2,
        }
    }

    /// Whether replies in this mode are image URLs
    pub fn is_image(self) -> bool {
        matches!(self, Self::Image)
    }

    /// Lowercase label used in logs, metrics and on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            other => Err(format!("Unknown generation mode: {other}")),
        }
    }
}

/// Output of one provider call
///
/// `content` is the reply text, or a stable public URL for image mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Reply text or image URL
    pub content: String,
}

impl Reply {
    /// Wrap provider output in a reply
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Stateless adapter to an external generation service
///
/// Calls carry no correlation id, so a retry after a timeout may generate
/// twice; nothing downstream can detect it.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a reply for a single prompt
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] classified as retryable (network, 5xx,
    /// timeout) or not (rejected prompt, unusable response).
    async fn generate(&self, prompt: &str) -> std::result::Result<Reply, ProviderError>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}
