// Database module for Tai Chat
// Provides SQLite persistence for settings, conversations and messages

pub mod manager;
pub mod migrations;
pub mod models;
pub mod settings_repo;
pub mod chat_repo;
pub mod conversation_repo;
pub mod store;

pub use manager::DatabaseManager;
pub use models::*;
pub use store::{ConversationStore, SettingsStore, UpdateOutcome};
