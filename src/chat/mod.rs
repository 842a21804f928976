//! Chat module: conversations, sends and streamed answers
//!
//! This module provides:
//! - Persistent conversations and messages (through the store traits)
//! - Background sends that stream into a placeholder message
//! - Cancellable requests
//! - Events for the presentation layer
//!
//! Module structure:
//! - types.rs: ChatError, SendMessageResponse, SendOutcome
//! - session.rs: StreamSession, SendState
//! - events.rs: ChatEvent, UiSender
//! - view_state.rs: ViewState
//! - task_registry.rs: ACTIVE_CHAT_TASKS, task management
//! - completion.rs: run_chat_completion
//! - conversation_commands.rs / message_commands.rs / settings_commands.rs: the command surface

pub mod types;
pub mod session;
pub mod events;
pub mod view_state;
pub mod task_registry;
pub mod completion;
pub mod conversation_commands;
pub mod message_commands;
pub mod settings_commands;

#[cfg(test)]
pub(crate) mod test_support;

pub use types::{ChatError, SendMessageResponse, SendOutcome};
pub use session::{InvalidTransition, SendState, StreamSession};
pub use events::{ChatEvent, EventReceiver, UiSender};
pub use view_state::ViewState;
pub use completion::run_chat_completion;

pub use conversation_commands::{
    create_conversation,
    list_conversations,
    get_conversation,
    delete_conversation,
};

pub use message_commands::{
    send_message,
    get_messages,
    cancel_message,
    is_processing,
};

pub use settings_commands::{load_settings, save_settings};
