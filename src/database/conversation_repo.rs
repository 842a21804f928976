// Conversation repository for Tai Chat
// Handles CRUD operations for the conversations listed in the sidebar

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use super::models::Conversation;
use super::DatabaseManager;

impl DatabaseManager {
    /// Create a new conversation
    pub fn create_conversation(&self, conversation: &Conversation) -> Result<String> {
        self.with_connection(|conn| {
            create_conversation_impl(conn, conversation)
        })
    }

    /// Get all conversations, most recent activity first
    pub fn get_conversations(&self) -> Result<Vec<Conversation>> {
        self.with_connection(|conn| {
            get_conversations_impl(conn)
        })
    }

    /// Get a single conversation by ID
    pub fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        self.with_connection(|conn| {
            get_conversation_impl(conn, conversation_id)
        })
    }

    /// Record new activity: preview text and timestamp
    pub fn touch_conversation(&self, conversation_id: &str, preview: &str, at: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let updated = conn.execute(
                "UPDATE conversations SET last_message_preview = ?, last_activity_at = ? WHERE id = ?",
                params![preview, at, conversation_id],
            ).context("Failed to update conversation activity")?;
            Ok(updated > 0)
        })
    }

    /// Update a conversation's title
    pub fn update_conversation_title(&self, conversation_id: &str, title: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let updated = conn.execute(
                "UPDATE conversations SET title = ? WHERE id = ?",
                params![title, conversation_id],
            ).context("Failed to update conversation title")?;
            Ok(updated > 0)
        })
    }

    /// Delete a conversation and all its messages
    pub fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            delete_conversation_impl(conn, conversation_id)
        })
    }
}

fn row_to_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        title: row.get(1)?,
        last_message_preview: row.get(2)?,
        last_activity_at: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn create_conversation_impl(conn: &Connection, conversation: &Conversation) -> Result<String> {
    conn.execute(
        r#"
        INSERT INTO conversations (id, title, last_message_preview, last_activity_at, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            conversation.id,
            conversation.title,
            conversation.last_message_preview,
            conversation.last_activity_at,
            conversation.created_at,
        ],
    ).context("Failed to create conversation")?;

    Ok(conversation.id.clone())
}

fn get_conversations_impl(conn: &Connection) -> Result<Vec<Conversation>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, title, last_message_preview, last_activity_at, created_at
        FROM conversations
        ORDER BY last_activity_at DESC, created_at DESC
        "#
    ).context("Failed to prepare get_conversations query")?;

    let conversations = stmt.query_map([], row_to_conversation)
        .context("Failed to query conversations")?;

    conversations.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect conversations")
}

fn get_conversation_impl(conn: &Connection, conversation_id: &str) -> Result<Option<Conversation>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, title, last_message_preview, last_activity_at, created_at
        FROM conversations
        WHERE id = ?
        "#
    ).context("Failed to prepare get_conversation query")?;

    match stmt.query_row(params![conversation_id], row_to_conversation) {
        Ok(conversation) => Ok(Some(conversation)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get conversation"),
    }
}

fn delete_conversation_impl(conn: &Connection, conversation_id: &str) -> Result<()> {
    // Delete all messages in this conversation first
    conn.execute(
        "DELETE FROM messages WHERE conversation_id = ?",
        params![conversation_id],
    ).context("Failed to delete messages for conversation")?;

    conn.execute(
        "DELETE FROM conversations WHERE id = ?",
        params![conversation_id],
    ).context("Failed to delete conversation")?;

    Ok(())
}
