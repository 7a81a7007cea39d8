//! Error types for CreditChat
//!
//! Infrastructure failures (configuration, storage, HTTP, credentials) are
//! carried by [`CreditChatError`] and usually travel inside an
//! `anyhow::Error`. The generation pipeline and the provider adapters use
//! their own typed errors, [`SubmitError`] and [`ProviderError`], because
//! callers branch on them.

use thiserror::Error;

/// Main error type for CreditChat infrastructure operations
#[derive(Error, Debug)]
pub enum CreditChatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat or ledger storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Provider construction errors (HTTP client setup, unknown type)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Authentication errors (missing or invalid bearer token)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Operator command rejected (e.g. publishing a text message)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for CreditChat operations
///
/// Uses `anyhow::Error` so plumbing code can attach context freely.
pub type Result<T> = anyhow::Result<T>;

/// Failure reported by a generation provider
///
/// Both image steps (synthesis and upload) collapse into this one type.
/// `retryable` tells the caller whether repeating the same request may
/// succeed; it says nothing about whether the provider already did work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The call did not complete within the allotted time
    #[error("provider timed out: {0}")]
    Timeout(String),

    /// The provider could not be reached or answered with a server error
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider rejected the request (malformed prompt, bad upload)
    #[error("provider rejected request: {0}")]
    Rejected(String),

    /// The provider answered with something we cannot use
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether the caller's retry policy may repeat the request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }

    /// Classify a transport-level reqwest failure
    pub fn from_transport(context: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{context}: {err}"))
        } else {
            Self::Unavailable(format!("{context}: {err}"))
        }
    }

    /// Classify a non-success HTTP status returned by a provider
    ///
    /// 5xx and 429 are treated as transient, every other 4xx as a rejection.
    pub fn from_status(context: &str, status: reqwest::StatusCode, body: &str) -> Self {
        let detail = if body.trim().is_empty() {
            format!("{context}: HTTP {status}")
        } else {
            format!("{context}: HTTP {status}: {}", body.trim())
        };

        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Self::Unavailable(detail)
        } else {
            Self::Rejected(detail)
        }
    }
}

/// Terminal failure of one generation submission
///
/// Variants up to and including `InsufficientCredits` are raised before any
/// side effect. Later variants may leave the user's prompt persisted without
/// a reply; [`SubmitError::prompt_recorded`] reports which case applies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The request itself is malformed (empty prompt or chat id)
    #[error("{0}")]
    InvalidRequest(String),

    /// The requesting user could not be resolved
    #[error("Not authorized")]
    Unauthenticated,

    /// The chat does not exist or belongs to someone else
    #[error("Chat not found")]
    ChatNotFound,

    /// The user's balance does not cover the generation cost
    #[error("You don't have enough credits to use this feature (required {required}, available {available})")]
    InsufficientCredits {
        /// Credits the requested mode costs
        required: u32,
        /// Credits the user had at check time
        available: u32,
    },

    /// A chat write failed
    #[error("Failed to save chat: {message}")]
    Persistence {
        /// Underlying storage failure
        message: String,
        /// Whether the user's prompt was persisted before the failure
        prompt_recorded: bool,
    },

    /// The provider failed after the prompt was recorded
    #[error("Generation failed: {cause}")]
    GenerationFailed {
        /// Provider failure
        cause: ProviderError,
    },

    /// The provider call exceeded the pipeline timeout
    #[error("Generation timed out after {seconds}s")]
    ProviderTimeout {
        /// Configured timeout that elapsed
        seconds: u64,
    },
}

impl SubmitError {
    /// Stable machine-readable kind used on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Unauthenticated => "unauthenticated",
            Self::ChatNotFound => "chat_not_found",
            Self::InsufficientCredits { .. } => "insufficient_credits",
            Self::Persistence { .. } => "persistence_error",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::ProviderTimeout { .. } => "provider_timeout",
        }
    }

    /// Whether retrying the same request may succeed without user action
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GenerationFailed { cause } => cause.is_retryable(),
            Self::ProviderTimeout { .. } => true,
            _ => false,
        }
    }

    /// Whether the user's prompt message is already stored in the chat
    pub fn prompt_recorded(&self) -> bool {
        match self {
            Self::Persistence {
                prompt_recorded, ..
            } => *prompt_recorded,
            Self::GenerationFailed { .. } | Self::ProviderTimeout { .. } => true,
            _ => false,
        }
    }

    /// Short human-readable message safe to show to the requesting user
    pub fn user_message(&self) -> String {
        match self {
            Self::GenerationFailed {
                cause: ProviderError::Unavailable(_),
            } => "Generation service is currently unavailable. Please try again later.".to_string(),
            Self::GenerationFailed { .. } => "The generation service could not handle this prompt.".to_string(),
            Self::Persistence { .. } => "Your chat could not be saved. Please try again.".to_string(),
            Self::ProviderTimeout { seconds } => {
                format!("Generation timed out after {}s. Please try again.", seconds)
            }
            other => other.to_string(),
        }
    }
}
