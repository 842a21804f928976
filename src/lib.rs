// Tai Chat - chat client core
//
// Conversations and messages in a local SQLite database, answers streamed
// from OpenRouter into a placeholder message while the UI follows along
// through events.

// Per-chunk logging macros - exported for use by other modules
#[macro_use]
pub mod macros;

// Core modules
pub mod state;
pub mod database;
pub mod llm_engine;
pub mod chat;

pub use state::{AppState, ChatOptions};

/// Initialize env_logger to output to stderr (reads RUST_LOG env var)
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}
