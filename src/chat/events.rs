//! Events sent from the chat pipeline to the presentation layer

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::database::{ChatMessage, ChatMessageStatus, ChatRole, Conversation};
use super::types::SendOutcome;

/// One change to apply to the presentation state.
///
/// Message updates always carry the whole message, never a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    ConversationCreated {
        conversation: Conversation,
    },
    /// New title, preview or activity time
    ConversationUpdated {
        conversation: Conversation,
    },
    ConversationDeleted {
        conversation_id: String,
    },
    MessageAdded {
        message: ChatMessage,
    },
    MessageReplaced {
        conversation_id: String,
        message_id: String,
        role: ChatRole,
        content: String,
        status: ChatMessageStatus,
    },
    SendFinished {
        conversation_id: String,
        message_id: String,
        outcome: SendOutcome,
    },
}

impl ChatEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ChatEvent::ConversationCreated { .. } => "conversation_created",
            ChatEvent::ConversationUpdated { .. } => "conversation_updated",
            ChatEvent::ConversationDeleted { .. } => "conversation_deleted",
            ChatEvent::MessageAdded { .. } => "message_added",
            ChatEvent::MessageReplaced { .. } => "message_replaced",
            ChatEvent::SendFinished { .. } => "send_finished",
        }
    }

    /// Whole-message replacement for an assistant message
    pub fn assistant_replaced(
        conversation_id: &str,
        message_id: &str,
        content: &str,
        status: ChatMessageStatus,
    ) -> Self {
        ChatEvent::MessageReplaced {
            conversation_id: conversation_id.to_string(),
            message_id: message_id.to_string(),
            role: ChatRole::Assistant,
            content: content.to_string(),
            status,
        }
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<ChatEvent>;

/// Sending half of the UI channel; emitting never fails the caller
#[derive(Debug, Clone)]
pub struct UiSender {
    tx: Option<mpsc::UnboundedSender<ChatEvent>>,
}

impl UiSender {
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sender with no UI attached; every event is dropped
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: ChatEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        let kind = event.kind();
        if tx.send(event).is_err() {
            log::debug!("UI receiver dropped, discarding {} event", kind);
        }
    }
}
