//! `creditchat images publish|unpublish`

use crate::error::{CreditChatError, Result};
use crate::storage::{ChatStore, SqliteStorage};
use colored::Colorize;

/// Show or hide one image message in the public gallery
///
/// # Errors
///
/// Returns error if the chat or message does not exist, or the message is
/// not an image
pub fn set_published(
    storage: &SqliteStorage,
    chat_id: &str,
    index: usize,
    published: bool,
) -> Result<()> {
    if !storage.set_published(chat_id, index, published)? {
        return Err(CreditChatError::InvalidOperation(format!(
            "No message {} in chat {}",
            index, chat_id
        ))
        .into());
    }

    tracing::info!(chat_id, index, published, "Changed gallery visibility");
    let verb = if published { "Published" } else { "Unpublished" };
    println!("{}", format!("{} message {} of chat {}", verb, index, chat_id).green());
    Ok(())
}
