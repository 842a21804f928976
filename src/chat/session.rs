//! Per-send state: the accumulating answer and the send lifecycle

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendState {
    PendingUserWrite,
    AwaitingResponse,
    Streaming,
    Complete,
    Failed,
    Cancelled,
}

impl SendState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SendState::Complete | SendState::Failed | SendState::Cancelled)
    }

    pub fn can_transition_to(&self, next: SendState) -> bool {
        use SendState::*;
        matches!(
            (*self, next),
            (PendingUserWrite, AwaitingResponse)
                | (PendingUserWrite, Failed)
                | (AwaitingResponse, Streaming)
                | (AwaitingResponse, Failed)
                | (AwaitingResponse, Cancelled)
                | (Streaming, Complete)
                | (Streaming, Failed)
                | (Streaming, Cancelled)
        )
    }
}

/// Rejected state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: SendState,
    pub to: SendState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid send transition {:?} -> {:?}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// One in-flight send, bound to the placeholder message created for it.
///
/// The accumulated text only ever grows.
#[derive(Debug, Clone)]
pub struct StreamSession {
    conversation_id: String,
    message_id: String,
    accumulated: String,
    fragments: usize,
    state: SendState,
}

impl StreamSession {
    /// Start a session whose user message and placeholder are already stored
    pub fn new(conversation_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
            accumulated: String::new(),
            fragments: 0,
            state: SendState::AwaitingResponse,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// The placeholder this session writes to
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn state(&self) -> SendState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.accumulated
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn transition(&mut self, next: SendState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Append a fragment and return the whole text so far.
    ///
    /// The first fragment moves an awaiting session to `Streaming`.
    pub fn push(&mut self, fragment: &str) -> Result<&str, InvalidTransition> {
        if self.state == SendState::AwaitingResponse {
            self.transition(SendState::Streaming)?;
        } else if self.state != SendState::Streaming {
            return Err(InvalidTransition {
                from: self.state,
                to: SendState::Streaming,
            });
        }
        self.accumulated.push_str(fragment);
        self.fragments += 1;
        Ok(&self.accumulated)
    }
}
