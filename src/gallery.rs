//! Public gallery of published images
//!
//! A read-only view computed from a full scan of every chat. Nothing is
//! cached, so a message published or deleted is reflected on the next call.

use crate::error::Result;
use crate::storage::ChatStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One gallery entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedImage {
    /// Public URL of the image
    pub image_url: String,
    /// Owner's display name as snapshotted on the chat
    pub owner_name: String,
}

/// List every published image, most recent first
///
/// Ordering is by the image message's timestamp, ties broken by the owning
/// chat's `updated_at`.
///
/// # Errors
///
/// Returns error if the chat scan fails
pub fn list_published_images(chats: &dyn ChatStore) -> Result<Vec<PublishedImage>> {
    let mut entries: Vec<(DateTime<Utc>, DateTime<Utc>, PublishedImage)> = chats
        .scan_all()?
        .into_iter()
        .flat_map(|chat| {
            let updated_at = chat.updated_at;
            let owner_name = chat.owner_name;
            chat.messages
                .into_iter()
                .filter(|m| m.is_image && m.is_published)
                .map(move |m| {
                    (
                        m.timestamp,
                        updated_at,
                        PublishedImage {
                            image_url: m.content,
                            owner_name: owner_name.clone(),
                        },
                    )
                })
        })
        .collect();

    entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    tracing::debug!(count = entries.len(), "Listed published images");

    Ok(entries.into_iter().map(|(_, _, image)| image).collect())
}
