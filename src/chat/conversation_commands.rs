//! Conversation commands - sidebar CRUD

use crate::database::Conversation;
use crate::state::AppState;
use super::events::ChatEvent;
use super::task_registry::cancel_conversation_tasks;
use super::types::ChatError;

/// Create an empty conversation ("New chat"); it is titled by its first message
pub async fn create_conversation(state: &AppState) -> Result<Conversation, ChatError> {
    let conversation = Conversation::new();
    state.store().create_conversation(&conversation).await?;

    log::info!("Created conversation {}", conversation.id);
    state.events().emit(ChatEvent::ConversationCreated {
        conversation: conversation.clone(),
    });
    Ok(conversation)
}

/// List conversations, most recent activity first
pub async fn list_conversations(state: &AppState) -> Result<Vec<Conversation>, ChatError> {
    Ok(state.store().list_conversations().await?)
}

/// Get a single conversation
pub async fn get_conversation(
    state: &AppState,
    conversation_id: &str,
) -> Result<Option<Conversation>, ChatError> {
    Ok(state.store().get_conversation(conversation_id).await?)
}

/// Delete a conversation and its messages, cancelling any send in flight
pub async fn delete_conversation(state: &AppState, conversation_id: &str) -> Result<(), ChatError> {
    let cancelled = cancel_conversation_tasks(conversation_id);
    if cancelled > 0 {
        log::info!("Cancelled {} send(s) of conversation {}", cancelled, conversation_id);
    }

    state.store().delete_conversation(conversation_id).await?;
    state.events().emit(ChatEvent::ConversationDeleted {
        conversation_id: conversation_id.to_string(),
    });
    Ok(())
}
