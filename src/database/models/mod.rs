// Database models - Re-exports all domain-specific models
//
// - settings.rs: Application settings (credential, model, theme)
// - chat.rs: Conversations and messages

mod settings;
mod chat;

pub use settings::{
    AppSettings, Setting, Theme, AVAILABLE_MODELS, MODEL_ENV, MODEL_SETTING, OPENROUTER_KEY_ENV,
    OPENROUTER_KEY_SETTING, THEME_SETTING,
};
pub use chat::{
    derive_title, new_id, now_timestamp, preview_text, ChatMessage, ChatMessageStatus, ChatRole,
    Conversation, DEFAULT_CONVERSATION_TITLE, PREVIEW_MAX_CHARS, TITLE_MAX_CHARS,
};
