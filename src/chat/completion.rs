//! Chat completion logic - streams the answer into the placeholder message

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::chunk_debug;
use crate::database::{ChatMessageStatus, ChatRole, ConversationStore, UpdateOutcome};
use crate::llm_engine::{CompletionRequest, LlmError, Message};
use crate::state::AppState;
use super::events::ChatEvent;
use super::session::{InvalidTransition, SendState, StreamSession};
use super::types::{ChatError, SendOutcome};

impl From<InvalidTransition> for ChatError {
    fn from(err: InvalidTransition) -> Self {
        ChatError::Protocol(err.to_string())
    }
}

/// Build the request history: every complete message except the placeholder
async fn load_history(
    store: &dyn ConversationStore,
    conversation_id: &str,
    placeholder_id: &str,
) -> Result<Vec<Message>, ChatError> {
    let messages = store.list_messages_by_conversation(conversation_id).await?;

    Ok(messages
        .into_iter()
        .filter(|msg| msg.id != placeholder_id && msg.status.is_complete())
        .map(|msg| match msg.role {
            ChatRole::User => Message::user(msg.content),
            ChatRole::Assistant => Message::assistant(msg.content),
        })
        .collect())
}

/// Fetch the answer and fold every fragment into the session.
///
/// Emits one whole-message replacement per fragment. Nothing is persisted here.
async fn stream_into_session(
    state: &AppState,
    session: &mut StreamSession,
    cancel_token: &CancellationToken,
) -> Result<(), ChatError> {
    let settings = state.current_settings().await;
    let api_key = settings
        .credential()
        .ok_or_else(|| ChatError::from(LlmError::NotConfigured))?
        .to_string();

    let store = state.store();
    let history = load_history(store.as_ref(), session.conversation_id(), session.message_id()).await?;
    let request = CompletionRequest::new(settings.model.clone(), history);
    let provider = state.provider();

    log::info!(
        "Requesting completion for conversation {} ({} history message(s), model {})",
        session.conversation_id(),
        request.messages.len(),
        request.model
    );

    if !state.options().streaming {
        let response = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Err(ChatError::Cancelled),
            result = provider.complete(&api_key, request) => result?,
        };
        let text = session.push(&response.content)?.to_string();
        emit_progress(state, session, &text);
        return Ok(());
    }

    let mut fragments = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => return Err(ChatError::Cancelled),
        result = provider.complete_streaming(&api_key, request.streaming()) => result?,
    };
    session.transition(SendState::Streaming)?;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Err(ChatError::Cancelled),
            item = fragments.next() => item,
        };

        match next {
            Some(Ok(fragment)) => {
                let text = session.push(&fragment)?.to_string();
                chunk_debug!(
                    "Fragment {} for {}: +{} bytes, {} total",
                    session.fragment_count(),
                    session.message_id(),
                    fragment.len(),
                    text.len()
                );
                emit_progress(state, session, &text);
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(()),
        }
    }
}

fn emit_progress(state: &AppState, session: &StreamSession, text: &str) {
    state.events().emit(ChatEvent::assistant_replaced(
        session.conversation_id(),
        session.message_id(),
        text,
        ChatMessageStatus::Pending,
    ));
}

/// Write the terminal content of the placeholder
async fn commit(
    store: &dyn ConversationStore,
    session: &StreamSession,
    content: &str,
    status: ChatMessageStatus,
) -> Result<(), ChatError> {
    match store.update_message_content(session.message_id(), content, status).await? {
        UpdateOutcome::Updated => Ok(()),
        UpdateOutcome::NotFound => Err(ChatError::Persistence(format!(
            "Message not found: {}",
            session.message_id()
        ))),
    }
}

/// Run one send to its end and report how it went.
///
/// The placeholder receives exactly one terminal write. Failures never escape:
/// they become an assistant message reading `Error: <cause>`.
pub async fn run_chat_completion(
    state: AppState,
    conversation_id: String,
    message_id: String,
    cancel_token: CancellationToken,
) -> SendOutcome {
    let mut session = StreamSession::new(conversation_id, message_id);
    let store = state.store();

    let result = match stream_into_session(&state, &mut session, &cancel_token).await {
        Ok(()) => commit(store.as_ref(), &session, session.text(), ChatMessageStatus::Complete).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            if let Err(e) = session.transition(SendState::Complete) {
                log::warn!("{}", e);
            }
            state.events().emit(ChatEvent::assistant_replaced(
                session.conversation_id(),
                session.message_id(),
                session.text(),
                ChatMessageStatus::Complete,
            ));
            log::info!(
                "Completed message {} ({} fragment(s), {} bytes)",
                session.message_id(),
                session.fragment_count(),
                session.text().len()
            );
            SendOutcome::Complete
        }
        Err(ChatError::Cancelled) => {
            if let Err(e) = session.transition(SendState::Cancelled) {
                log::warn!("{}", e);
            }
            log::info!("Message {} cancelled", session.message_id());
            state.events().emit(ChatEvent::assistant_replaced(
                session.conversation_id(),
                session.message_id(),
                session.text(),
                ChatMessageStatus::Cancelled,
            ));
            if let Err(e) = commit(store.as_ref(), &session, session.text(), ChatMessageStatus::Cancelled).await {
                log::warn!("Failed to persist cancelled message {}: {}", session.message_id(), e);
            }
            SendOutcome::Cancelled
        }
        Err(e) => {
            if let Err(transition) = session.transition(SendState::Failed) {
                log::debug!("{}", transition);
            }
            log::error!("Chat completion failed for {}: {}", session.message_id(), e);
            let error_text = format!("Error: {}", e);
            state.events().emit(ChatEvent::assistant_replaced(
                session.conversation_id(),
                session.message_id(),
                &error_text,
                ChatMessageStatus::Error,
            ));
            if let Err(persist) = commit(store.as_ref(), &session, &error_text, ChatMessageStatus::Error).await {
                log::error!("Failed to persist error for {}: {}", session.message_id(), persist);
            }
            SendOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}
