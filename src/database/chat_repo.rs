// Message repository for Tai Chat
// Handles CRUD operations for conversation messages

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::models::{ChatMessage, ChatMessageStatus, ChatRole};
use super::DatabaseManager;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, role, content, created_at, sequence_id, status";

impl DatabaseManager {
    /// Save a message (insert, or overwrite content/status of an existing id)
    pub fn save_message(&self, message: &ChatMessage) -> Result<()> {
        self.with_connection(|conn| {
            save_message_impl(conn, message)
        })
    }

    /// Append a message at the end of a conversation and return it
    pub fn create_message(
        &self,
        conversation_id: &str,
        role: ChatRole,
        content: &str,
        status: ChatMessageStatus,
    ) -> Result<ChatMessage> {
        self.with_connection(|conn| {
            // sequence lookup and insert run under the same connection lock
            let sequence_id = get_next_sequence_id_impl(conn, conversation_id)?;
            let message = ChatMessage::new(conversation_id, role, content, sequence_id, status);
            save_message_impl(conn, &message)?;
            Ok(message)
        })
    }

    /// Get all messages for a conversation, oldest first
    pub fn get_messages_by_conversation(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        self.with_connection(|conn| {
            get_messages_by_conversation_impl(conn, conversation_id)
        })
    }

    /// Get a single message by ID
    pub fn get_message(&self, message_id: &str) -> Result<Option<ChatMessage>> {
        self.with_connection(|conn| {
            get_message_impl(conn, message_id)
        })
    }

    /// Replace content and status of a message.
    ///
    /// Returns `false` when no message has this ID.
    pub fn update_message_content(
        &self,
        message_id: &str,
        content: &str,
        status: ChatMessageStatus,
    ) -> Result<bool> {
        self.with_connection(|conn| {
            update_message_content_impl(conn, message_id, content, status)
        })
    }

    /// Delete all messages of a conversation (the conversation itself stays)
    pub fn delete_messages_by_conversation(&self, conversation_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            delete_messages_by_conversation_impl(conn, conversation_id)
        })
    }

    /// Get placeholders that never received a terminal status
    pub fn get_pending_messages(&self) -> Result<Vec<ChatMessage>> {
        self.with_connection(|conn| {
            get_pending_messages_impl(conn)
        })
    }

    /// Mark pending placeholders created before `started_before` as failed.
    ///
    /// Used at startup: an old pending row means its process died mid-send.
    /// Younger rows may belong to another running process and are left alone.
    pub fn fail_interrupted_messages(
        &self,
        error_text: &str,
        started_before: DateTime<Utc>,
    ) -> Result<usize> {
        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction()
                .context("Failed to start transaction")?;

            let mut count = 0;
            for message in get_pending_messages_impl(&tx)? {
                let stale = match DateTime::parse_from_rfc3339(&message.created_at) {
                    Ok(created) => created.with_timezone(&Utc) < started_before,
                    Err(_) => true,
                };
                if stale
                    && update_message_content_impl(&tx, &message.id, error_text, ChatMessageStatus::Error)?
                {
                    count += 1;
                }
            }

            tx.commit().context("Failed to mark interrupted messages")?;
            Ok(count)
        })
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: ChatRole::from_str(&row.get::<_, String>(2)?),
        content: row.get(3)?,
        created_at: row.get(4)?,
        sequence_id: row.get(5)?,
        status: ChatMessageStatus::from_str(&row.get::<_, String>(6)?),
    })
}

fn save_message_impl(conn: &Connection, message: &ChatMessage) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO messages (
            id, conversation_id, role, content, created_at, sequence_id, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            content = excluded.content,
            status = excluded.status
        "#,
        params![
            message.id,
            message.conversation_id,
            message.role.as_str(),
            message.content,
            message.created_at,
            message.sequence_id,
            message.status.as_str(),
        ],
    ).context("Failed to save message")?;

    Ok(())
}

fn get_next_sequence_id_impl(conn: &Connection, conversation_id: &str) -> Result<i64> {
    let max_seq: Option<i64> = conn.query_row(
        "SELECT MAX(sequence_id) FROM messages WHERE conversation_id = ?",
        params![conversation_id],
        |row| row.get(0),
    ).context("Failed to get max sequence_id for conversation")?;

    Ok(max_seq.unwrap_or(0) + 1)
}

fn get_messages_by_conversation_impl(conn: &Connection, conversation_id: &str) -> Result<Vec<ChatMessage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM messages WHERE conversation_id = ? ORDER BY sequence_id ASC",
        MESSAGE_COLUMNS
    )).context("Failed to prepare get_messages_by_conversation query")?;

    let messages = stmt.query_map(params![conversation_id], row_to_message)
        .context("Failed to query messages")?;

    messages.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect messages")
}

fn get_message_impl(conn: &Connection, message_id: &str) -> Result<Option<ChatMessage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM messages WHERE id = ?",
        MESSAGE_COLUMNS
    )).context("Failed to prepare get_message query")?;

    match stmt.query_row(params![message_id], row_to_message) {
        Ok(msg) => Ok(Some(msg)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get message"),
    }
}

fn update_message_content_impl(
    conn: &Connection,
    message_id: &str,
    content: &str,
    status: ChatMessageStatus,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE messages SET content = ?, status = ? WHERE id = ?",
        params![content, status.as_str(), message_id],
    ).context("Failed to update message content")?;

    Ok(updated > 0)
}

fn delete_messages_by_conversation_impl(conn: &Connection, conversation_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM messages WHERE conversation_id = ?",
        params![conversation_id],
    ).context("Failed to delete messages for conversation")?;

    Ok(())
}

fn get_pending_messages_impl(conn: &Connection) -> Result<Vec<ChatMessage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM messages WHERE status = 'pending' ORDER BY created_at ASC",
        MESSAGE_COLUMNS
    )).context("Failed to prepare get_pending_messages query")?;

    let messages = stmt.query_map([], row_to_message)
        .context("Failed to query pending messages")?;

    messages.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect pending messages")
}
