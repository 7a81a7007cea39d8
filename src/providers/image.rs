//! Image provider for CreditChat
//!
//! Image generation takes two external round trips:
//!
//! 1. **Synthesis**: GET a prompt-addressed URL on the image service,
//!    which renders the prompt and answers with raw PNG bytes.
//! 2. **Upload**: POST those bytes (as a base64 data URI) to the media
//!    library, which answers with a durable public URL.
//!
//! Either step can fail on its own; both surface as one [`ProviderError`].
//! A failed upload discards the synthesized bytes.

use crate::config::ImageConfig;
use crate::error::{CreditChatError, ProviderError, Result};
use crate::providers::{GenerationProvider, Reply};

use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use reqwest::multipart::Form;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Synthesize-then-upload image provider
pub struct ImageProvider {
    client: Client,
    config: ImageConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    url: String,
}

impl ImageProvider {
    /// Create a new image provider
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: ImageConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("creditchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CreditChatError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized image provider: endpoint={}, folder={}",
            config.endpoint,
            config.folder
        );

        Ok(Self { client, config })
    }

    /// Build the prompt-addressed synthesis URL
    ///
    /// Shape: `{endpoint}/ik-genimg-prompt-{prompt}/{folder}/{stamp}.png?tr=w-{w},h-{h}`
    /// with the prompt percent-encoded as a single path segment.
    ///
    /// # Examples
    ///
    /// ```
    /// use creditchat::config::ImageConfig;
    /// use creditchat::providers::ImageProvider;
    /// use std::time::Duration;
    ///
    /// let config = ImageConfig {
    ///     endpoint: "https://ik.example.io/acct".to_string(),
    ///     ..ImageConfig::default()
    /// };
    /// let provider = ImageProvider::new(config, Duration::from_secs(30)).unwrap();
    /// let url = provider.synthesis_url("a red fox", 42).unwrap();
    /// assert_eq!(
    ///     url.as_str(),
    ///     "https://ik.example.io/acct/ik-genimg-prompt-a%20red%20fox/creditchat/42.png?tr=w-800,h-800"
    /// );
    /// ```
    pub fn synthesis_url(&self, prompt: &str, stamp: i64) -> std::result::Result<Url, ProviderError> {
        let mut url = Url::parse(&self.config.endpoint).map_err(|e| {
            ProviderError::Rejected(format!("Invalid image endpoint `{}`: {}", self.config.endpoint, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::Rejected(format!(
                    "Image endpoint `{}` cannot carry a path",
                    self.config.endpoint
                ))
            })?
            .pop_if_empty()
            .push(&format!("ik-genimg-prompt-{prompt}"))
            .push(&self.config.folder)
            .push(&format!("{stamp}.png"));

        url.set_query(Some(&format!(
            "tr=w-{},h-{}",
            self.config.width, self.config.height
        )));
        Ok(url)
    }

    async fn synthesize(&self, prompt: &str, stamp: i64) -> std::result::Result<Bytes, ProviderError> {
        let url = self.synthesis_url(prompt, stamp)?;
        tracing::debug!(%url, "Requesting image synthesis");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("image synthesis", &e))?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(ProviderError::Unavailable(
                "Image generation service is currently unavailable".to_string(),
            ));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status("image synthesis", status, &error_text));
        }

        let image = response
            .bytes()
            .await
            .map_err(|e| ProviderError::from_transport("image synthesis body", &e))?;
        if image.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "Image synthesis returned no data".to_string(),
            ));
        }

        tracing::debug!(bytes = image.len(), "Image synthesized");
        Ok(image)
    }

    async fn upload(&self, image: &Bytes, stamp: i64) -> std::result::Result<String, ProviderError> {
        let data_uri = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(image)
        );
        let form = Form::new()
            .text("file", data_uri)
            .text("fileName", format!("generated_{stamp}.png"))
            .text("folder", self.config.folder.clone())
            .text("useUniqueFileName", "true");

        let mut request = self.client.post(&self.config.upload_url).multipart(form);
        if let Some(key) = self.config.private_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.basic_auth(key, Some(""));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("image upload", &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Image upload returned error {}: {}", status, error_text);
            return Err(ProviderError::from_status("image upload", status, &error_text));
        }

        let body: UploadResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse upload response: {}", e))
        })?;

        if body.url.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "Upload response did not contain a URL".to_string(),
            ));
        }

        Ok(body.url)
    }
}

#[async_trait]
impl GenerationProvider for ImageProvider {
    async fn generate(&self, prompt: &str) -> std::result::Result<Reply, ProviderError> {
        let stamp = chrono::Utc::now().timestamp_millis();
        let image = self.synthesize(prompt, stamp).await?;
        let url = self.upload(&image, stamp).await.map_err(|e| {
            tracing::warn!(error = %e, "Image synthesized but upload failed");
            e
        })?;
        Ok(Reply::new(url))
    }

    fn name(&self) -> &str {
        "image"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(endpoint: &str) -> ImageProvider {
        let config = ImageConfig {
            endpoint: endpoint.to_string(),
            ..ImageConfig::default()
        };
        ImageProvider::new(config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_synthesis_url_encodes_prompt_as_one_segment() {
        let url = provider("https://ik.example.io/acct/")
            .synthesis_url("cats/dogs & more", 7)
            .unwrap();
        assert_eq!(url.path(), "/acct/ik-genimg-prompt-cats%2Fdogs%20&%20more/creditchat/7.png");
        assert_eq!(url.query(), Some("tr=w-800,h-800"));
    }

    #[test]
    fn test_synthesis_url_rejects_invalid_endpoint() {
        let err = provider("not a url").synthesis_url("x", 1).unwrap_err();
        assert!(!err.is_retryable());
    }
}
