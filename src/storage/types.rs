use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to every freshly created chat
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Prompt typed by the chat owner
    User,
    /// Generated reply
    Assistant,
    /// Out-of-band instruction
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A single entry in a chat's message log
///
/// `content` is text, or a public image URL when `is_image` is set.
/// `is_published` only ever holds `true` for image messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Author of the message
    pub role: Role,
    /// Text or image URL
    pub content: String,
    /// When the message was recorded
    pub timestamp: DateTime<Utc>,
    /// Whether `content` is an image URL
    #[serde(default)]
    pub is_image: bool,
    /// Whether the image is visible in the public gallery
    #[serde(default)]
    pub is_published: bool,
}

impl Message {
    /// Creates a user prompt message stamped with the current time
    ///
    /// # Examples
    ///
    /// ```
    /// use creditchat::storage::{Message, Role};
    ///
    /// let msg = Message::user("Draw a cat");
    /// assert_eq!(msg.role, Role::User);
    /// assert!(!msg.is_image);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: super::now(),
            is_image: false,
            is_published: false,
        }
    }

    /// Creates a textual assistant reply
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: super::now(),
            is_image: false,
            is_published: false,
        }
    }

    /// Creates an assistant reply carrying an image URL
    ///
    /// # Examples
    ///
    /// ```
    /// use creditchat::storage::Message;
    ///
    /// let msg = Message::assistant_image("https://img.example/cat.png", true);
    /// assert!(msg.is_image);
    /// assert!(msg.is_published);
    /// ```
    pub fn assistant_image(url: impl Into<String>, published: bool) -> Self {
        Self {
            role: Role::Assistant,
            content: url.into(),
            timestamp: super::now(),
            is_image: true,
            is_published: published,
        }
    }

    /// Drops a publish flag set on a non-image message
    pub(crate) fn normalized(mut self) -> Self {
        if !self.is_image {
            self.is_published = false;
        }
        self
    }
}

/// A persisted chat document
///
/// `owner_name` is a snapshot of the owner's display name taken when the
/// chat was created. It is never refreshed, so it can drift from the
/// user's current name; the gallery shows the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Opaque unique identifier (UUID v4)
    pub id: String,
    /// Owning user
    pub owner_id: String,
    /// Owner display name at creation time
    pub owner_name: String,
    /// Chat title
    pub title: String,
    /// Ordered message log
    pub messages: Vec<Message>,
    /// When the chat was created
    pub created_at: DateTime<Utc>,
    /// When the chat last received a message
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Listing projection of this chat
    pub fn summary(&self) -> ChatSummary {
        ChatSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            updated_at: self.updated_at,
            message_count: self.messages.len(),
        }
    }
}

/// Metadata for a chat in an owner's listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    /// Chat identifier
    pub id: String,
    /// Chat title
    pub title: String,
    /// When the chat last received a message
    pub updated_at: DateTime<Utc>,
    /// Number of messages in the chat
    pub message_count: usize,
}

/// Account record resolved by the auth collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Current credit balance
    pub credits: u32,
}
