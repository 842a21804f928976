// Database models - Conversations and messages
use serde::{Deserialize, Serialize};

/// Maximum characters kept from the first user message when deriving a title
pub const TITLE_MAX_CHARS: usize = 30;

/// Maximum characters kept for the sidebar preview of the last message
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Title used for conversations that have no user message yet
pub const DEFAULT_CONVERSATION_TITLE: &str = "New chat";

/// Generate a new unique record identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as an RFC 3339 string (the format stored in every timestamp column)
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Derive a conversation title from the first user message.
///
/// Uses the first non-empty line, truncated on a character boundary.
pub fn derive_title(first_message: &str) -> String {
    let first_line = first_message
        .trim()
        .lines()
        .next()
        .unwrap_or("")
        .trim();
    let title: String = first_line.chars().take(TITLE_MAX_CHARS).collect();
    if title.is_empty() {
        DEFAULT_CONVERSATION_TITLE.to_string()
    } else {
        title
    }
}

/// Shorten message text for the conversation list
pub fn preview_text(content: &str) -> String {
    content.trim().chars().take(PREVIEW_MAX_CHARS).collect()
}

/// Message author
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "assistant" => ChatRole::Assistant,
            _ => ChatRole::User,
        }
    }
}

/// Lifecycle of a persisted message.
///
/// User messages are written `Complete`. Assistant placeholders start `Pending`
/// and receive exactly one terminal status when their send finishes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageStatus {
    Pending,
    Complete,
    Cancelled,
    Error,
}

impl ChatMessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMessageStatus::Pending => "pending",
            ChatMessageStatus::Complete => "complete",
            ChatMessageStatus::Cancelled => "cancelled",
            ChatMessageStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pending" => ChatMessageStatus::Pending,
            "cancelled" => ChatMessageStatus::Cancelled,
            "error" => ChatMessageStatus::Error,
            _ => ChatMessageStatus::Complete,
        }
    }

    /// Whether the message was fully written and belongs in the request history
    pub fn is_complete(&self) -> bool {
        matches!(self, ChatMessageStatus::Complete)
    }
}

/// A message inside a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub role: ChatRole,
    pub content: String,
    pub created_at: String,
    /// Position inside the conversation, starting at 1
    pub sequence_id: i64,
    pub status: ChatMessageStatus,
}

impl ChatMessage {
    pub fn new(
        conversation_id: &str,
        role: ChatRole,
        content: &str,
        sequence_id: i64,
        status: ChatMessageStatus,
    ) -> Self {
        Self {
            id: new_id(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at: now_timestamp(),
            sequence_id,
            status,
        }
    }
}

/// A conversation shown in the sidebar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub last_message_preview: String,
    pub last_activity_at: String,
    pub created_at: String,
}

impl Conversation {
    /// Create an empty conversation with the default title
    pub fn new() -> Self {
        Self::titled(DEFAULT_CONVERSATION_TITLE)
    }

    /// Create a conversation whose title comes from its first user message
    pub fn from_first_message(content: &str) -> Self {
        let mut conversation = Self::titled(&derive_title(content));
        conversation.last_message_preview = preview_text(content);
        conversation
    }

    fn titled(title: &str) -> Self {
        let now = now_timestamp();
        Self {
            id: new_id(),
            title: title.to_string(),
            last_message_preview: String::new(),
            last_activity_at: now.clone(),
            created_at: now,
        }
    }

    /// Whether the title is still the placeholder given to an empty conversation
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_CONVERSATION_TITLE
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_title_truncates_first_line() {
        let title = derive_title("  Explain the borrow checker in detail please, with examples\nsecond line");
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
        assert!(title.starts_with("Explain the borrow checker"));
    }

    #[test]
    fn test_derive_title_handles_multibyte() {
        let title = derive_title("你好，请帮我写一首关于春天的诗，要求七言绝句，并且押韵工整，意境优美");
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_derive_title_empty_falls_back() {
        assert_eq!(derive_title("   \n  "), DEFAULT_CONVERSATION_TITLE);
    }

    #[test]
    fn test_status_roundtrip_unknown_defaults_to_complete() {
        assert_eq!(ChatMessageStatus::from_str("pending"), ChatMessageStatus::Pending);
        assert_eq!(ChatMessageStatus::from_str("garbage"), ChatMessageStatus::Complete);
        assert_eq!(ChatRole::from_str("Assistant"), ChatRole::Assistant);
    }

    #[test]
    fn test_new_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }
}
