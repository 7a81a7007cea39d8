//! Owner-scoped chat documents
//!
//! Every read and write takes the owner id alongside the chat id. A chat
//! that exists but belongs to someone else is reported exactly like a chat
//! that does not exist, so callers cannot discover other users' chats.

use super::{
    format_ts, now, parse_ts, storage_err, Chat, ChatSummary, Message, SqliteStorage,
    DEFAULT_CHAT_TITLE,
};
use crate::error::Result;
use anyhow::Context;
use rusqlite::{params, OptionalExtension, TransactionBehavior};

/// Persisted chat documents, scoped by owner
///
/// "Not found" is expressed as `None`/`false`; `Err` is reserved for
/// storage failures.
pub trait ChatStore: Send + Sync {
    /// Create an empty chat with the default title
    fn create(&self, owner_id: &str, owner_name: &str) -> Result<Chat>;

    /// Load a chat owned by `owner_id`
    fn get(&self, chat_id: &str, owner_id: &str) -> Result<Option<Chat>>;

    /// Append one message to the end of a chat's log
    ///
    /// There is no de-duplication: calling this twice stores the message
    /// twice. The stored message is returned, with its timestamp raised to
    /// the previous message's timestamp if the clock went backwards.
    fn append_message(&self, chat_id: &str, owner_id: &str, message: Message)
        -> Result<Option<Message>>;

    /// All chats of an owner, most recently updated first
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ChatSummary>>;

    /// Irreversibly delete a chat and all of its messages
    fn delete(&self, chat_id: &str, owner_id: &str) -> Result<bool>;

    /// Every chat of every owner, for read-only aggregation
    fn scan_all(&self) -> Result<Vec<Chat>>;

    /// Toggle the gallery flag of one image message
    ///
    /// Administrative operation outside the generation path. Returns
    /// `false` when the chat or message index does not exist.
    fn set_published(&self, chat_id: &str, message_index: usize, published: bool) -> Result<bool>;
}

type ChatRow = (String, String, String, String, String, String, String);

fn chat_from_row(row: ChatRow) -> Result<Chat> {
    let (id, owner_id, owner_name, title, messages_json, created_at, updated_at) = row;
    let messages: Vec<Message> = serde_json::from_str(&messages_json)
        .context("Failed to deserialize messages")
        .map_err(storage_err)?;

    Ok(Chat {
        id,
        owner_id,
        owner_name,
        title,
        messages,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn read_chat_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

const SELECT_CHAT: &str =
    "SELECT id, owner_id, owner_name, title, messages, created_at, updated_at FROM chats";

impl ChatStore for SqliteStorage {
    fn create(&self, owner_id: &str, owner_name: &str) -> Result<Chat> {
        let conn = self.connect()?;
        let now = now();
        let chat = Chat {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            owner_name: owner_name.to_string(),
            title: DEFAULT_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO chats (id, owner_id, owner_name, title, messages, created_at, updated_at)
            VALUES (?, ?, ?, ?, '[]', ?, ?)",
            params![
                chat.id,
                chat.owner_id,
                chat.owner_name,
                chat.title,
                format_ts(&now),
                format_ts(&now)
            ],
        )
        .context("Failed to insert chat")
        .map_err(storage_err)?;

        tracing::debug!(chat_id = %chat.id, owner_id, "Created chat");
        Ok(chat)
    }

    fn get(&self, chat_id: &str, owner_id: &str) -> Result<Option<Chat>> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                &format!("{SELECT_CHAT} WHERE id = ? AND owner_id = ?"),
                params![chat_id, owner_id],
                read_chat_row,
            )
            .optional()
            .context("Failed to query chat")
            .map_err(storage_err)?;

        row.map(chat_from_row).transpose()
    }

    fn append_message(
        &self,
        chat_id: &str,
        owner_id: &str,
        message: Message,
    ) -> Result<Option<Message>> {
        let mut conn = self.connect()?;

        // Immediate: take the write lock before reading so concurrent
        // appends to the same chat cannot lose each other's message.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to start transaction")
            .map_err(storage_err)?;

        let messages_json: Option<String> = tx
            .query_row(
                "SELECT messages FROM chats WHERE id = ? AND owner_id = ?",
                params![chat_id, owner_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query chat")
            .map_err(storage_err)?;

        let Some(messages_json) = messages_json else {
            return Ok(None);
        };

        let mut messages: Vec<Message> = serde_json::from_str(&messages_json)
            .context("Failed to deserialize messages")
            .map_err(storage_err)?;

        let mut message = message.normalized();
        if let Some(last) = messages.last() {
            if message.timestamp < last.timestamp {
                message.timestamp = last.timestamp;
            }
        }
        messages.push(message.clone());

        let messages_json = serde_json::to_string(&messages)
            .context("Failed to serialize messages")
            .map_err(storage_err)?;

        tx.execute(
            "UPDATE chats SET messages = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
            params![messages_json, format_ts(&message.timestamp), chat_id, owner_id],
        )
        .context("Failed to update chat")
        .map_err(storage_err)?;

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(storage_err)?;

        Ok(Some(message))
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ChatSummary>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!(
                "{SELECT_CHAT} WHERE owner_id = ? ORDER BY updated_at DESC, created_at DESC"
            ))
            .context("Failed to prepare statement")
            .map_err(storage_err)?;

        let rows = stmt
            .query_map(params![owner_id], read_chat_row)
            .context("Failed to query chats")
            .map_err(storage_err)?;

        let mut summaries = Vec::new();
        for row in rows {
            let row = row.context("Failed to read chat row").map_err(storage_err)?;
            summaries.push(chat_from_row(row)?.summary());
        }

        Ok(summaries)
    }

    fn delete(&self, chat_id: &str, owner_id: &str) -> Result<bool> {
        let conn = self.connect()?;
        let deleted = conn
            .execute(
                "DELETE FROM chats WHERE id = ? AND owner_id = ?",
                params![chat_id, owner_id],
            )
            .context("Failed to delete chat")
            .map_err(storage_err)?;

        Ok(deleted > 0)
    }

    fn scan_all(&self) -> Result<Vec<Chat>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(SELECT_CHAT)
            .context("Failed to prepare statement")
            .map_err(storage_err)?;

        let rows = stmt
            .query_map([], read_chat_row)
            .context("Failed to scan chats")
            .map_err(storage_err)?;

        let mut chats = Vec::new();
        for row in rows {
            let row = row.context("Failed to read chat row").map_err(storage_err)?;
            chats.push(chat_from_row(row)?);
        }

        Ok(chats)
    }

    fn set_published(&self, chat_id: &str, message_index: usize, published: bool) -> Result<bool> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to start transaction")
            .map_err(storage_err)?;

        let messages_json: Option<String> = tx
            .query_row(
                "SELECT messages FROM chats WHERE id = ?",
                params![chat_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query chat")
            .map_err(storage_err)?;

        let Some(messages_json) = messages_json else {
            return Ok(false);
        };

        let mut messages: Vec<Message> = serde_json::from_str(&messages_json)
            .context("Failed to deserialize messages")
            .map_err(storage_err)?;

        let Some(message) = messages.get_mut(message_index) else {
            return Ok(false);
        };
        if !message.is_image {
            return Err(crate::error::CreditChatError::InvalidOperation(format!(
                "message {message_index} of chat {chat_id} is not an image"
            ))
            .into());
        }
        message.is_published = published;

        let messages_json = serde_json::to_string(&messages)
            .context("Failed to serialize messages")
            .map_err(storage_err)?;

        // Publishing is not a new turn, so updated_at is left alone.
        tx.execute(
            "UPDATE chats SET messages = ? WHERE id = ?",
            params![messages_json, chat_id],
        )
        .context("Failed to update chat")
        .map_err(storage_err)?;

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(storage_err)?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Role;
    use chrono::Duration;
    use std::thread::sleep;
    use tempfile::tempdir;

    fn create_test_storage() -> (SqliteStorage, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let storage =
            SqliteStorage::new_with_path(dir.path().join("chat.db")).expect("failed to create storage");
        (storage, dir)
    }

    #[test]
    fn test_create_returns_empty_chat_with_default_title() {
        let (storage, _dir) = create_test_storage();
        let chat = storage.create("user-1", "Alice").expect("create failed");

        assert_eq!(chat.title, "New Chat");
        assert_eq!(chat.owner_name, "Alice");
        assert!(chat.messages.is_empty());

        let loaded = storage.get(&chat.id, "user-1").expect("get failed");
        assert_eq!(loaded, Some(chat));
    }

    #[test]
    fn test_appended_message_matches_loaded_chat() {
        let (storage, _dir) = create_test_storage();
        let chat = storage.create("user-1", "Alice").expect("create failed");

        let stored = storage
            .append_message(&chat.id, "user-1", Message::user("hello"))
            .expect("append failed")
            .expect("chat found");

        let loaded = storage.get(&chat.id, "user-1").unwrap().unwrap();
        assert_eq!(loaded.messages, vec![stored.clone()]);
        assert_eq!(loaded.updated_at, stored.timestamp);
        assert_eq!(loaded.created_at, chat.created_at);
    }

    #[test]
    fn test_get_hides_chats_of_other_owners() {
        let (storage, _dir) = create_test_storage();
        let chat = storage.create("user-1", "Alice").expect("create failed");

        assert!(storage.get(&chat.id, "user-2").expect("get failed").is_none());
        assert!(storage.get("missing", "user-1").expect("get failed").is_none());
    }

    #[test]
    fn test_append_message_preserves_order() {
        let (storage, _dir) = create_test_storage();
        let chat = storage.create("user-1", "Alice").expect("create failed");

        storage
            .append_message(&chat.id, "user-1", Message::user("hello"))
            .expect("append failed")
            .expect("chat found");
        storage
            .append_message(&chat.id, "user-1", Message::assistant("hi there"))
            .expect("append failed")
            .expect("chat found");

        let loaded = storage.get(&chat.id, "user-1").unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[0].role, Role::User);
        assert_eq!(loaded.messages[1].content, "hi there");
        assert!(loaded.updated_at >= chat.updated_at);
    }

    #[test]
    fn test_append_message_to_foreign_chat_is_not_found() {
        let (storage, _dir) = create_test_storage();
        let chat = storage.create("user-1", "Alice").expect("create failed");

        let result = storage
            .append_message(&chat.id, "intruder", Message::user("hello"))
            .expect("append failed");
        assert!(result.is_none());
        assert!(storage.get(&chat.id, "user-1").unwrap().unwrap().messages.is_empty());
    }

    #[test]
    fn test_append_message_clamps_backwards_timestamp() {
        let (storage, _dir) = create_test_storage();
        let chat = storage.create("user-1", "Alice").expect("create failed");

        let first = storage
            .append_message(&chat.id, "user-1", Message::user("first"))
            .unwrap()
            .unwrap();

        let mut skewed = Message::assistant("from the past");
        skewed.timestamp = first.timestamp - Duration::seconds(30);
        let stored = storage
            .append_message(&chat.id, "user-1", skewed)
            .unwrap()
            .unwrap();

        assert_eq!(stored.timestamp, first.timestamp);
        let loaded = storage.get(&chat.id, "user-1").unwrap().unwrap();
        assert!(loaded
            .messages
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn test_append_message_clears_publish_flag_on_text() {
        let (storage, _dir) = create_test_storage();
        let chat = storage.create("user-1", "Alice").expect("create failed");

        let mut message = Message::assistant("just text");
        message.is_published = true;
        let stored = storage
            .append_message(&chat.id, "user-1", message)
            .unwrap()
            .unwrap();
        assert!(!stored.is_published);
    }

    #[test]
    fn test_list_by_owner_orders_by_updated_at() {
        let (storage, _dir) = create_test_storage();
        let older = storage.create("user-1", "Alice").unwrap();
        sleep(std::time::Duration::from_millis(10));
        let newer = storage.create("user-1", "Alice").unwrap();
        storage.create("user-2", "Bob").unwrap();

        let listed = storage.list_by_owner("user-1").expect("list failed");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);

        // Appending to the older chat moves it to the front.
        sleep(std::time::Duration::from_millis(10));
        storage
            .append_message(&older.id, "user-1", Message::user("bump"))
            .unwrap();
        let listed = storage.list_by_owner("user-1").expect("list failed");
        assert_eq!(listed[0].id, older.id);
        assert_eq!(listed[0].message_count, 1);
    }

    #[test]
    fn test_delete_removes_chat_for_owner_only() {
        let (storage, _dir) = create_test_storage();
        let chat = storage.create("user-1", "Alice").unwrap();

        assert!(!storage.delete(&chat.id, "user-2").expect("delete failed"));
        assert!(storage.get(&chat.id, "user-1").unwrap().is_some());

        assert!(storage.delete(&chat.id, "user-1").expect("delete failed"));
        assert!(storage.get(&chat.id, "user-1").unwrap().is_none());
        assert!(!storage.delete(&chat.id, "user-1").expect("second delete failed"));
    }

    #[test]
    fn test_set_published_toggles_image_messages_only() {
        let (storage, _dir) = create_test_storage();
        let chat = storage.create("user-1", "Alice").unwrap();
        storage
            .append_message(&chat.id, "user-1", Message::user("a cat"))
            .unwrap();
        storage
            .append_message(
                &chat.id,
                "user-1",
                Message::assistant_image("https://img.example/cat.png", false),
            )
            .unwrap();

        assert!(storage.set_published(&chat.id, 1, true).expect("publish failed"));
        let loaded = storage.get(&chat.id, "user-1").unwrap().unwrap();
        assert!(loaded.messages[1].is_published);

        assert!(storage.set_published(&chat.id, 0, true).is_err());
        assert!(!storage.set_published(&chat.id, 7, true).unwrap());
        assert!(!storage.set_published("missing", 0, true).unwrap());
    }
}
