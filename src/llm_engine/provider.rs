//! Completion provider trait and types
//!
//! Defines the common interface for chat-completion backends (currently OpenRouter)

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

/// Error types for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LlmError {
    /// No API key configured; raised before any request is made
    NotConfigured,
    /// Network failure, timeout, or an unreadable body
    RequestFailed(String),
    /// The endpoint answered with a non-2xx status
    Http { status: u16, message: String },
    /// The payload could not be understood, or carried an embedded error
    Protocol(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::NotConfigured => {
                write!(f, "OpenRouter API key is not configured. Add it in settings.")
            }
            LlmError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            LlmError::Http { message, .. } => write!(f, "{}", message),
            LlmError::Protocol(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message in the request history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request for a chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier, e.g. `google/gemini-2.0-flash-exp:free`
    pub model: String,
    /// Conversation history, oldest first
    pub messages: Vec<Message>,
    /// Whether to stream the response
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
        }
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Response from a non-streaming completion request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionResponse {
    /// Generated text content
    pub content: String,
    /// Model that was asked for
    pub model: String,
}

/// Lazy, finite sequence of text fragments from one streamed response.
///
/// An `Err` item is always the last item.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// The trait every completion backend implements
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Get the provider name (e.g., "openrouter")
    fn provider_name(&self) -> &'static str;

    /// Run a completion request and return the whole answer
    async fn complete(
        &self,
        api_key: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, LlmError>;

    /// Run a completion request with streaming.
    ///
    /// Status errors are returned before any fragment; failures after that
    /// arrive as the final item of the stream.
    async fn complete_streaming(
        &self,
        api_key: &str,
        request: CompletionRequest,
    ) -> Result<FragmentStream, LlmError>;
}
