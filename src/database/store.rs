// Storage traits consumed by the chat pipeline
// DatabaseManager is the production implementation; tests can substitute their own

use anyhow::Result;
use async_trait::async_trait;

use super::models::{AppSettings, ChatMessage, ChatMessageStatus, ChatRole, Conversation};
use super::DatabaseManager;

/// Result of an update that targets one record by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

impl From<bool> for UpdateOutcome {
    fn from(updated: bool) -> Self {
        if updated {
            UpdateOutcome::Updated
        } else {
            UpdateOutcome::NotFound
        }
    }
}

/// Conversations and their messages
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<String>;

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    /// Most recent activity first
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;

    async fn touch_conversation(
        &self,
        conversation_id: &str,
        preview: &str,
        at: &str,
    ) -> Result<UpdateOutcome>;

    async fn retitle_conversation(&self, conversation_id: &str, title: &str) -> Result<UpdateOutcome>;

    /// Removes the conversation and every message in it
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;

    /// Append a message at the end of the conversation
    async fn create_message(
        &self,
        conversation_id: &str,
        role: ChatRole,
        content: &str,
        status: ChatMessageStatus,
    ) -> Result<ChatMessage>;

    async fn update_message_content(
        &self,
        message_id: &str,
        content: &str,
        status: ChatMessageStatus,
    ) -> Result<UpdateOutcome>;

    /// Oldest first
    async fn list_messages_by_conversation(&self, conversation_id: &str) -> Result<Vec<ChatMessage>>;
}

/// Settings dialog persistence
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Never fails; falls back to defaults
    async fn load_settings(&self) -> AppSettings;

    async fn save_settings(&self, settings: &AppSettings) -> Result<()>;
}

// Repository calls block on SQLite, so every method hops to the blocking pool
#[async_trait]
impl ConversationStore for DatabaseManager {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<String> {
        let conversation = conversation.clone();
        self.run_blocking(move |db| db.create_conversation(&conversation)).await
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let conversation_id = conversation_id.to_string();
        self.run_blocking(move |db| db.get_conversation(&conversation_id)).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.run_blocking(|db| db.get_conversations()).await
    }

    async fn touch_conversation(
        &self,
        conversation_id: &str,
        preview: &str,
        at: &str,
    ) -> Result<UpdateOutcome> {
        let (conversation_id, preview, at) = (conversation_id.to_string(), preview.to_string(), at.to_string());
        self.run_blocking(move |db| db.touch_conversation(&conversation_id, &preview, &at))
            .await
            .map(UpdateOutcome::from)
    }

    async fn retitle_conversation(&self, conversation_id: &str, title: &str) -> Result<UpdateOutcome> {
        let (conversation_id, title) = (conversation_id.to_string(), title.to_string());
        self.run_blocking(move |db| db.update_conversation_title(&conversation_id, &title))
            .await
            .map(UpdateOutcome::from)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let conversation_id = conversation_id.to_string();
        self.run_blocking(move |db| db.delete_conversation(&conversation_id)).await
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        role: ChatRole,
        content: &str,
        status: ChatMessageStatus,
    ) -> Result<ChatMessage> {
        let (conversation_id, content) = (conversation_id.to_string(), content.to_string());
        self.run_blocking(move |db| db.create_message(&conversation_id, role, &content, status)).await
    }

    async fn update_message_content(
        &self,
        message_id: &str,
        content: &str,
        status: ChatMessageStatus,
    ) -> Result<UpdateOutcome> {
        let (message_id, content) = (message_id.to_string(), content.to_string());
        self.run_blocking(move |db| db.update_message_content(&message_id, &content, status))
            .await
            .map(UpdateOutcome::from)
    }

    async fn list_messages_by_conversation(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let conversation_id = conversation_id.to_string();
        self.run_blocking(move |db| db.get_messages_by_conversation(&conversation_id)).await
    }
}

#[async_trait]
impl SettingsStore for DatabaseManager {
    async fn load_settings(&self) -> AppSettings {
        match self.run_blocking(|db| Ok(db.load_app_settings())).await {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Failed to load settings, using defaults: {:#}", e);
                AppSettings::default()
            }
        }
    }

    async fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let settings = settings.clone();
        self.run_blocking(move |db| db.save_app_settings(&settings)).await
    }
}
