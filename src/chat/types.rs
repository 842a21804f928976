//! Chat types and errors

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::llm_engine::LlmError;

/// Why a send failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatError {
    /// Missing credential or unusable settings; raised before any network call
    Configuration(String),
    /// The user input was rejected before anything was written
    InvalidInput(String),
    /// Network failure or non-2xx answer
    Transport(String),
    /// Unparseable payload or an error embedded in the response
    Protocol(String),
    /// Store write failure, or the placeholder disappeared
    Persistence(String),
    /// Explicit cancellation by the user
    Cancelled,
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Configuration(msg)
            | ChatError::InvalidInput(msg)
            | ChatError::Transport(msg)
            | ChatError::Protocol(msg)
            | ChatError::Persistence(msg) => write!(f, "{}", msg),
            ChatError::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NotConfigured => ChatError::Configuration(err.to_string()),
            LlmError::RequestFailed(_) | LlmError::Http { .. } => ChatError::Transport(err.to_string()),
            LlmError::Protocol(msg) => ChatError::Protocol(msg),
        }
    }
}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        ChatError::Persistence(format!("{:#}", err))
    }
}

/// Response when sending a chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendMessageResponse {
    /// The conversation the message went to (created if none was given)
    pub conversation_id: String,
    pub user_message_id: String,
    /// The placeholder that will receive the answer
    pub assistant_message_id: String,
}

/// How a send ended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SendOutcome {
    Complete,
    Failed { error: String },
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_errors_map_onto_chat_errors() {
        assert!(matches!(ChatError::from(LlmError::NotConfigured), ChatError::Configuration(_)));
        assert_eq!(
            ChatError::from(LlmError::Http { status: 500, message: "API request failed: 500".into() }),
            ChatError::Transport("API request failed: 500".into())
        );
        assert_eq!(
            ChatError::from(LlmError::Protocol("rate limited".into())).to_string(),
            "rate limited"
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(SendOutcome::Failed { error: "boom".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failed", "error": "boom"}));
    }
}
