//! Chat task registry - tracks in-flight sends so they can be cancelled

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tokio_util::sync::CancellationToken;

/// An in-flight send
pub struct ChatTask {
    pub conversation_id: String,
    pub message_id: String,
    pub cancel_token: CancellationToken,
}

/// Global registry of active sends (keyed by placeholder message_id)
pub static ACTIVE_CHAT_TASKS: Lazy<DashMap<String, ChatTask>> = Lazy::new(DashMap::new);

/// Register a new send
pub fn register_task(message_id: String, conversation_id: String, cancel_token: CancellationToken) {
    ACTIVE_CHAT_TASKS.insert(
        message_id.clone(),
        ChatTask {
            conversation_id,
            message_id,
            cancel_token,
        },
    );
}

/// Remove a finished send from the registry
pub fn remove_task(message_id: &str) {
    ACTIVE_CHAT_TASKS.remove(message_id);
}

/// Cancel and remove every send of a conversation; returns how many were cancelled
pub fn cancel_conversation_tasks(conversation_id: &str) -> usize {
    let tasks_to_cancel: Vec<String> = ACTIVE_CHAT_TASKS
        .iter()
        .filter(|entry| entry.conversation_id == conversation_id)
        .map(|entry| entry.message_id.clone())
        .collect();

    let mut cancelled = 0;
    for message_id in tasks_to_cancel {
        if let Some((_, task)) = ACTIVE_CHAT_TASKS.remove(&message_id) {
            task.cancel_token.cancel();
            cancelled += 1;
        }
    }
    cancelled
}

/// Check if a conversation has a send in flight
pub fn is_conversation_processing(conversation_id: &str) -> bool {
    ACTIVE_CHAT_TASKS
        .iter()
        .any(|entry| entry.conversation_id == conversation_id)
}

/// Cancel a specific send by its placeholder id
pub fn cancel_task(message_id: &str) -> Option<CancellationToken> {
    ACTIVE_CHAT_TASKS
        .remove(message_id)
        .map(|(_, task)| {
            task.cancel_token.cancel();
            task.cancel_token
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::new_id;

    #[test]
    fn test_cancel_single_task() {
        let conversation_id = new_id();
        let message_id = new_id();
        let token = CancellationToken::new();
        register_task(message_id.clone(), conversation_id.clone(), token.clone());
        assert!(is_conversation_processing(&conversation_id));

        assert!(cancel_task(&message_id).is_some());
        assert!(token.is_cancelled());
        assert!(!is_conversation_processing(&conversation_id));
        assert!(cancel_task(&message_id).is_none());
    }

    #[test]
    fn test_cancel_conversation_tasks_leaves_others() {
        let conversation_id = new_id();
        let other_conversation = new_id();
        let tokens: Vec<CancellationToken> = (0..2).map(|_| CancellationToken::new()).collect();
        for token in &tokens {
            register_task(new_id(), conversation_id.clone(), token.clone());
        }
        let other_message = new_id();
        let other = CancellationToken::new();
        register_task(other_message.clone(), other_conversation.clone(), other.clone());

        assert_eq!(cancel_conversation_tasks(&conversation_id), 2);
        assert!(tokens.iter().all(CancellationToken::is_cancelled));
        assert!(!other.is_cancelled());
        assert!(is_conversation_processing(&other_conversation));

        remove_task(&other_message);
        assert!(!is_conversation_processing(&other_conversation));
    }
}
