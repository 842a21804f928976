// State management for Tai Chat

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chat::events::UiSender;
use crate::database::{AppSettings, ConversationStore, DatabaseManager, SettingsStore};
use crate::llm_engine::{CompletionProvider, OpenRouterProvider};

/// Text written into placeholders left pending by a previous run
pub const INTERRUPTED_MESSAGE: &str = "Error: response interrupted";

/// A pending placeholder older than this at startup belongs to no live send
pub const INTERRUPTED_AFTER_SECS: i64 = 600;

/// Switches for how sends are performed
#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    /// Stream the answer (`false` waits for the whole completion)
    pub streaming: bool,
    /// Let `OPENROUTER_API_KEY` / `TAI_CHAT_MODEL` override stored settings
    pub env_overrides: bool,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            streaming: true,
            env_overrides: false,
        }
    }
}

/// Shared handles used by every chat command and background send
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ConversationStore>,
    settings: Arc<dyn SettingsStore>,
    provider: Arc<dyn CompletionProvider>,
    events: UiSender,
    options: ChatOptions,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        settings: Arc<dyn SettingsStore>,
        provider: Arc<dyn CompletionProvider>,
        events: UiSender,
    ) -> Self {
        Self {
            store,
            settings,
            provider,
            events,
            options: ChatOptions::default(),
        }
    }

    /// One database backs both conversations and settings
    pub fn from_database(
        db: Arc<DatabaseManager>,
        provider: Arc<dyn CompletionProvider>,
        events: UiSender,
    ) -> Self {
        Self::new(db.clone(), db, provider, events)
    }

    /// Open the default database (`<data dir>/tai-chat/tai-chat.db`)
    pub fn open_default(events: UiSender) -> Result<Self> {
        let db = DatabaseManager::init_default().context("Failed to open database")?;
        Self::open(db, events)
    }

    /// Repair sends interrupted by a previous run and talk to OpenRouter
    pub fn open(db: DatabaseManager, events: UiSender) -> Result<Self> {
        let cutoff = chrono::Utc::now() - chrono::Duration::seconds(INTERRUPTED_AFTER_SECS);
        let interrupted = db.fail_interrupted_messages(INTERRUPTED_MESSAGE, cutoff)?;
        if interrupted > 0 {
            log::warn!("Marked {} interrupted message(s) as failed", interrupted);
        }

        let provider = OpenRouterProvider::with_default_config()?;
        Ok(Self::from_database(Arc::new(db), Arc::new(provider), events))
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> Arc<dyn ConversationStore> {
        self.store.clone()
    }

    pub fn settings_store(&self) -> Arc<dyn SettingsStore> {
        self.settings.clone()
    }

    pub fn provider(&self) -> Arc<dyn CompletionProvider> {
        self.provider.clone()
    }

    pub fn events(&self) -> &UiSender {
        &self.events
    }

    pub fn options(&self) -> ChatOptions {
        self.options
    }

    /// Settings as used for a send, env overrides applied when enabled
    pub async fn current_settings(&self) -> AppSettings {
        let settings = self.settings.load_settings().await;
        if self.options.env_overrides {
            settings.with_env_overrides()
        } else {
            settings
        }
    }
}
