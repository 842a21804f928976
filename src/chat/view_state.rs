//! Presentation state rebuilt from chat events

use std::collections::{HashMap, HashSet};

use crate::database::{ChatMessage, ChatMessageStatus, ChatRole, Conversation};
use super::events::ChatEvent;

/// What the sidebar and message thread show
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Most recent activity first
    conversations: Vec<Conversation>,
    messages: HashMap<String, Vec<ChatMessage>>,
    /// Conversations with a send in flight
    pending: HashSet<String>,
    selected: Option<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the sidebar from the store
    pub fn load_conversations(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
        self.sort_conversations();
    }

    /// Seed one thread from the store
    pub fn load_messages(&mut self, conversation_id: &str, messages: Vec<ChatMessage>) {
        self.messages.insert(conversation_id.to_string(), messages);
    }

    pub fn select(&mut self, conversation_id: Option<String>) {
        self.selected = conversation_id;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn messages(&self, conversation_id: &str) -> &[ChatMessage] {
        self.messages
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_pending(&self, conversation_id: &str) -> bool {
        self.pending.contains(conversation_id)
    }

    pub fn apply(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::ConversationCreated { conversation }
            | ChatEvent::ConversationUpdated { conversation } => {
                self.upsert_conversation(conversation.clone());
            }
            ChatEvent::ConversationDeleted { conversation_id } => {
                self.conversations.retain(|c| &c.id != conversation_id);
                self.messages.remove(conversation_id);
                self.pending.remove(conversation_id);
                if self.selected.as_ref() == Some(conversation_id) {
                    self.selected = None;
                }
            }
            ChatEvent::MessageAdded { message } => {
                if message.role == ChatRole::Assistant && message.status == ChatMessageStatus::Pending {
                    self.pending.insert(message.conversation_id.clone());
                }
                let thread = self.messages.entry(message.conversation_id.clone()).or_default();
                match thread.iter_mut().find(|m| m.id == message.id) {
                    Some(existing) => *existing = message.clone(),
                    None => thread.push(message.clone()),
                }
            }
            ChatEvent::MessageReplaced {
                conversation_id,
                message_id,
                role,
                content,
                status,
            } => {
                let target = self
                    .messages
                    .get_mut(conversation_id)
                    .and_then(|thread| thread.iter_mut().find(|m| &m.id == message_id));
                match target {
                    Some(message) => {
                        message.role = *role;
                        message.content = content.clone();
                        message.status = *status;
                    }
                    None => {
                        log::debug!("Replacement for unknown message {} ignored", message_id);
                    }
                }
            }
            ChatEvent::SendFinished { conversation_id, .. } => {
                self.pending.remove(conversation_id);
            }
        }
    }

    fn upsert_conversation(&mut self, conversation: Conversation) {
        match self.conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation,
            None => self.conversations.push(conversation),
        }
        self.sort_conversations();
    }

    fn sort_conversations(&mut self) {
        self.conversations
            .sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
    }
}
