//! JSON wire types shared by the HTTP server and the API client
//!
//! Every response is an object with a boolean `success` field. Successful
//! payloads are flattened next to it; failures carry [`Failure`].

use crate::error::SubmitError;
use crate::gallery::PublishedImage;
use crate::storage::{Chat, ChatSummary, User};
use serde::{Deserialize, Serialize};

/// Response wrapper adding the `success` flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Response payload
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    /// Wrap a successful payload
    pub fn ok(body: T) -> Self {
        Self {
            success: true,
            body,
        }
    }
}

impl Envelope<Failure> {
    /// Wrap a failure payload
    pub fn failed(failure: Failure) -> Self {
        Self {
            success: false,
            body: failure,
        }
    }
}

/// Failure payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    /// Machine-readable kind, e.g. `insufficient_credits`
    pub error_kind: String,
    /// Human-readable message
    pub message: String,
    /// Whether repeating the same request may succeed
    #[serde(default)]
    pub retryable: bool,
    /// Whether the prompt was stored before the failure
    #[serde(default)]
    pub prompt_recorded: bool,
}

impl Failure {
    /// Failure with no retry hint and no recorded prompt
    pub fn new(error_kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_kind: error_kind.into(),
            message: message.into(),
            retryable: false,
            prompt_recorded: false,
        }
    }
}

impl From<&SubmitError> for Failure {
    fn from(err: &SubmitError) -> Self {
        Self {
            error_kind: err.kind().to_string(),
            message: err.user_message(),
            retryable: err.is_retryable(),
            prompt_recorded: err.prompt_recorded(),
        }
    }
}

/// Body of `POST /api/message/text` and `POST /api/message/image`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Target chat
    pub chat_id: String,
    /// User prompt
    pub prompt: String,
    /// Publish the generated image to the gallery (image mode only)
    #[serde(default)]
    pub is_published: bool,
}

/// Body carrying only a chat id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatIdRequest {
    /// Chat identifier
    pub chat_id: String,
}

/// Chat listing payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatList {
    /// Chats, most recently updated first
    pub data: Vec<ChatSummary>,
}

/// Single chat payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatData {
    /// The chat, with messages
    pub data: Chat,
}

/// Plain acknowledgement payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Confirmation text
    pub message: String,
}

/// Gallery payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gallery {
    /// Published images, most recent first
    pub images: Vec<PublishedImage>,
}

/// Current user payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    /// The authenticated user
    pub user: User,
}
