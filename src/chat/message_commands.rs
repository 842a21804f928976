//! Chat message commands - send, query, cancel messages

use tokio_util::sync::CancellationToken;

use crate::database::{
    derive_title, now_timestamp, preview_text, ChatMessage, ChatMessageStatus, ChatRole,
    Conversation, UpdateOutcome,
};
use crate::state::AppState;
use super::completion::run_chat_completion;
use super::events::ChatEvent;
use super::task_registry::{cancel_task, is_conversation_processing, register_task, remove_task};
use super::types::{ChatError, SendMessageResponse};

/// Send a chat message and start the background completion.
///
/// With no conversation given, one is created and titled from `content`.
/// Returns once the user message and the placeholder are stored; the answer
/// arrives as events, ending with `SendFinished`.
pub async fn send_message(
    state: &AppState,
    conversation_id: Option<String>,
    content: String,
) -> Result<SendMessageResponse, ChatError> {
    if content.trim().is_empty() {
        return Err(ChatError::InvalidInput("Message is empty".to_string()));
    }

    let store = state.store();
    let events = state.events();

    let mut conversation = match conversation_id {
        Some(id) => store
            .get_conversation(&id)
            .await?
            .ok_or_else(|| ChatError::Persistence(format!("Conversation not found: {}", id)))?,
        None => {
            let conversation = Conversation::from_first_message(&content);
            store.create_conversation(&conversation).await?;
            log::info!("Created conversation {} ({})", conversation.id, conversation.title);
            events.emit(ChatEvent::ConversationCreated {
                conversation: conversation.clone(),
            });
            conversation
        }
    };

    if conversation.has_default_title() {
        let title = derive_title(&content);
        if store.retitle_conversation(&conversation.id, &title).await? == UpdateOutcome::Updated {
            conversation.title = title;
        }
    }

    // Save user message
    let user_message = store
        .create_message(&conversation.id, ChatRole::User, &content, ChatMessageStatus::Complete)
        .await?;
    events.emit(ChatEvent::MessageAdded {
        message: user_message.clone(),
    });

    conversation.last_message_preview = preview_text(&content);
    conversation.last_activity_at = now_timestamp();
    store
        .touch_conversation(
            &conversation.id,
            &conversation.last_message_preview,
            &conversation.last_activity_at,
        )
        .await?;
    events.emit(ChatEvent::ConversationUpdated {
        conversation: conversation.clone(),
    });

    // Create assistant placeholder (pending)
    let placeholder = store
        .create_message(&conversation.id, ChatRole::Assistant, "", ChatMessageStatus::Pending)
        .await?;
    events.emit(ChatEvent::MessageAdded {
        message: placeholder.clone(),
    });

    let conversation_id = conversation.id.clone();
    let assistant_message_id = placeholder.id.clone();
    let cancel_token = CancellationToken::new();
    register_task(
        assistant_message_id.clone(),
        conversation_id.clone(),
        cancel_token.clone(),
    );

    let task_state = state.clone();
    let task_conversation_id = conversation_id.clone();
    let task_message_id = assistant_message_id.clone();

    tokio::spawn(async move {
        let outcome = run_chat_completion(
            task_state.clone(),
            task_conversation_id.clone(),
            task_message_id.clone(),
            cancel_token,
        )
        .await;

        // Remove from active tasks
        remove_task(&task_message_id);

        task_state.events().emit(ChatEvent::SendFinished {
            conversation_id: task_conversation_id,
            message_id: task_message_id,
            outcome,
        });
    });

    Ok(SendMessageResponse {
        conversation_id,
        user_message_id: user_message.id,
        assistant_message_id,
    })
}

/// Get all messages of a conversation, oldest first
pub async fn get_messages(
    state: &AppState,
    conversation_id: &str,
) -> Result<Vec<ChatMessage>, ChatError> {
    Ok(state.store().list_messages_by_conversation(conversation_id).await?)
}

/// Cancel an in-flight send by its placeholder id.
///
/// The running task writes the partial answer with status `cancelled`.
/// Returns false when nothing was in flight for this id.
pub fn cancel_message(message_id: &str) -> bool {
    let cancelled = cancel_task(message_id).is_some();
    if cancelled {
        log::info!("Cancellation requested for message {}", message_id);
    }
    cancelled
}

/// Check if a conversation has a send in flight
pub fn is_processing(conversation_id: &str) -> bool {
    is_conversation_processing(conversation_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::events::{EventReceiver, UiSender};
    use crate::chat::test_support::{FakeProvider, Reply};
    use crate::chat::types::SendOutcome;
    use crate::chat::view_state::ViewState;
    use crate::database::{AppSettings, DatabaseManager, SettingsStore, DEFAULT_CONVERSATION_TITLE};
    use crate::llm_engine::LlmError;
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup(reply: Reply) -> (AppState, Arc<DatabaseManager>, EventReceiver) {
        let db = Arc::new(DatabaseManager::open_in_memory().unwrap());
        db.save_settings(&AppSettings {
            openrouter_key: "sk-test".to_string(),
            ..AppSettings::default()
        })
        .await
        .unwrap();
        let (sender, rx) = UiSender::channel();
        let state = AppState::from_database(db.clone(), Arc::new(FakeProvider::new(reply)), sender);
        (state, db, rx)
    }

    /// Feed events into a view until the send finishes
    async fn drain_until_finished(rx: &mut EventReceiver, view: &mut ViewState) -> SendOutcome {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for events")
                .expect("channel closed");
            view.apply(&event);
            if let ChatEvent::SendFinished { outcome, .. } = event {
                return outcome;
            }
        }
    }

    #[tokio::test]
    async fn test_first_send_creates_conversation() {
        let (state, db, mut rx) = setup(Reply::fragments(&["Hel", "lo"])).await;
        let mut view = ViewState::new();

        let response = send_message(&state, None, "Greet me\nplease".to_string()).await.unwrap();
        let outcome = drain_until_finished(&mut rx, &mut view).await;
        assert_eq!(outcome, SendOutcome::Complete);

        let conversation = db.get_conversation(&response.conversation_id).unwrap().unwrap();
        assert_eq!(conversation.title, "Greet me");
        assert_eq!(conversation.last_message_preview, "Greet me\nplease");

        let stored = db.get_messages_by_conversation(&response.conversation_id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, response.user_message_id);
        assert_eq!(stored[1].id, response.assistant_message_id);
        assert_eq!(stored[1].content, "Hello");

        // UI and store converge on the same text
        let shown = view.messages(&response.conversation_id);
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1].content, "Hello");
        assert_eq!(shown[1].status, ChatMessageStatus::Complete);
        assert_eq!(view.conversations()[0].id, response.conversation_id);
        assert!(!view.is_pending(&response.conversation_id));
        assert!(!is_processing(&response.conversation_id));
    }

    #[tokio::test]
    async fn test_send_into_new_chat_retitles_it() {
        let (state, db, mut rx) = setup(Reply::fragments(&["ok"])).await;
        let conversation = Conversation::new();
        db.create_conversation(&conversation).unwrap();
        assert_eq!(conversation.title, DEFAULT_CONVERSATION_TITLE);

        send_message(&state, Some(conversation.id.clone()), "Plan a trip to Kyoto in autumn for two weeks".to_string())
            .await
            .unwrap();
        drain_until_finished(&mut rx, &mut ViewState::new()).await;

        let stored = db.get_conversation(&conversation.id).unwrap().unwrap();
        assert_eq!(stored.title, "Plan a trip to Kyoto in autumn");
    }

    #[tokio::test]
    async fn test_title_is_kept_on_later_sends() {
        let (state, db, mut rx) = setup(Reply::fragments(&["ok"])).await;
        let first = send_message(&state, None, "First question".to_string()).await.unwrap();
        drain_until_finished(&mut rx, &mut ViewState::new()).await;

        send_message(&state, Some(first.conversation_id.clone()), "Second question".to_string())
            .await
            .unwrap();
        drain_until_finished(&mut rx, &mut ViewState::new()).await;

        let conversation = db.get_conversation(&first.conversation_id).unwrap().unwrap();
        assert_eq!(conversation.title, "First question");
        assert_eq!(conversation.last_message_preview, "Second question");
        assert_eq!(db.get_messages_by_conversation(&first.conversation_id).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_transport_failure_shows_error_message() {
        let (state, db, mut rx) = setup(Reply::Fail(LlmError::Http {
            status: 401,
            message: "No auth credentials found".to_string(),
        }))
        .await;
        let mut view = ViewState::new();

        let response = send_message(&state, None, "hi".to_string()).await.unwrap();
        let outcome = drain_until_finished(&mut rx, &mut view).await;
        assert_eq!(outcome, SendOutcome::Failed { error: "No auth credentials found".to_string() });

        let stored = db.get_message(&response.assistant_message_id).unwrap().unwrap();
        assert_eq!(stored.content, "Error: No auth credentials found");
        assert_eq!(stored.role, ChatRole::Assistant);
        assert_eq!(view.messages(&response.conversation_id)[1].content, stored.content);
    }

    #[tokio::test]
    async fn test_cancel_message() {
        let (state, db, mut rx) = setup(Reply::Hang(vec!["so far".to_string()])).await;

        let response = send_message(&state, None, "long answer please".to_string()).await.unwrap();
        assert!(is_processing(&response.conversation_id));

        // wait for the first fragment to reach the UI
        loop {
            match rx.recv().await.unwrap() {
                ChatEvent::MessageReplaced { content, .. } if content == "so far" => break,
                _ => {}
            }
        }

        assert!(cancel_message(&response.assistant_message_id));
        assert!(!cancel_message(&response.assistant_message_id));

        let outcome = drain_until_finished(&mut rx, &mut ViewState::new()).await;
        assert_eq!(outcome, SendOutcome::Cancelled);

        let stored = db.get_message(&response.assistant_message_id).unwrap().unwrap();
        assert_eq!(stored.content, "so far");
        assert_eq!(stored.status, ChatMessageStatus::Cancelled);
        assert!(!is_processing(&response.conversation_id));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let (state, db, _rx) = setup(Reply::fragments(&["x"])).await;
        let err = send_message(&state, None, "   ".to_string()).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidInput(_)));
        assert!(db.get_conversations().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_rejected() {
        let (state, _db, _rx) = setup(Reply::fragments(&["x"])).await;
        let err = send_message(&state, Some("missing".to_string()), "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_get_messages_in_order() {
        let (state, _db, mut rx) = setup(Reply::fragments(&["answer"])).await;
        let response = send_message(&state, None, "question".to_string()).await.unwrap();
        drain_until_finished(&mut rx, &mut ViewState::new()).await;

        let messages = get_messages(&state, &response.conversation_id).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["question", "answer"]);
    }
}
