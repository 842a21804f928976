//! Test doubles for the chat pipeline

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::database::{
    ChatMessage, ChatMessageStatus, ChatRole, Conversation, ConversationStore, DatabaseManager,
    UpdateOutcome,
};
use crate::llm_engine::{
    CompletionProvider, CompletionRequest, CompletionResponse, FragmentStream, LlmError,
};

/// What the fake provider answers with
#[derive(Clone)]
pub enum Reply {
    /// Stream these items, then end
    Stream(Vec<Result<String, LlmError>>),
    /// Stream these fragments, then never finish
    Hang(Vec<String>),
    /// Non-streaming answer
    Complete(String),
    /// Fail before any fragment
    Fail(LlmError),
}

impl Reply {
    pub fn fragments(parts: &[&str]) -> Self {
        Reply::Stream(parts.iter().map(|p| Ok(p.to_string())).collect())
    }
}

/// Provider that replays a scripted reply and records requests
pub struct FakeProvider {
    reply: Reply,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeProvider {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn complete(
        &self,
        _api_key: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Reply::Complete(content) => Ok(CompletionResponse {
                content: content.clone(),
                model,
            }),
            Reply::Fail(err) => Err(err.clone()),
            Reply::Stream(_) | Reply::Hang(_) => {
                Err(LlmError::Protocol("fake provider expects streaming".to_string()))
            }
        }
    }

    async fn complete_streaming(
        &self,
        _api_key: &str,
        request: CompletionRequest,
    ) -> Result<FragmentStream, LlmError> {
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Reply::Stream(items) => Ok(Box::pin(stream::iter(items.clone()))),
            Reply::Hang(parts) => {
                let items: Vec<Result<String, LlmError>> = parts.iter().cloned().map(Ok).collect();
                Ok(Box::pin(stream::iter(items).chain(stream::pending())))
            }
            Reply::Complete(content) => Ok(Box::pin(stream::iter(vec![Ok(content.clone())]))),
            Reply::Fail(err) => Err(err.clone()),
        }
    }
}

/// Store wrapper that records successful terminal writes and can fail updates
pub struct RecordingStore {
    db: Arc<DatabaseManager>,
    writes: Mutex<Vec<(String, String, ChatMessageStatus)>>,
    fail_updates: AtomicBool,
}

impl RecordingStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self {
            db,
            writes: Mutex::new(Vec::new()),
            fail_updates: AtomicBool::new(false),
        }
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }

    /// Every later `update_message_content` returns an error
    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    /// `(message_id, content, status)` of each update that reached a record
    pub fn terminal_writes(&self) -> Vec<(String, String, ChatMessageStatus)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationStore for RecordingStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<String> {
        self.db.create_conversation(conversation)
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        self.db.get_conversation(conversation_id)
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.db.get_conversations()
    }

    async fn touch_conversation(
        &self,
        conversation_id: &str,
        preview: &str,
        at: &str,
    ) -> Result<UpdateOutcome> {
        self.db.touch_conversation(conversation_id, preview, at).map(UpdateOutcome::from)
    }

    async fn retitle_conversation(&self, conversation_id: &str, title: &str) -> Result<UpdateOutcome> {
        self.db.update_conversation_title(conversation_id, title).map(UpdateOutcome::from)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.db.delete_conversation(conversation_id)
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        role: ChatRole,
        content: &str,
        status: ChatMessageStatus,
    ) -> Result<ChatMessage> {
        self.db.create_message(conversation_id, role, content, status)
    }

    async fn update_message_content(
        &self,
        message_id: &str,
        content: &str,
        status: ChatMessageStatus,
    ) -> Result<UpdateOutcome> {
        if self.fail_updates.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        let outcome = UpdateOutcome::from(self.db.update_message_content(message_id, content, status)?);
        if outcome == UpdateOutcome::Updated {
            self.writes
                .lock()
                .unwrap()
                .push((message_id.to_string(), content.to_string(), status));
        }
        Ok(outcome)
    }

    async fn list_messages_by_conversation(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        self.db.get_messages_by_conversation(conversation_id)
    }
}
