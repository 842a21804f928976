// Database models - Settings
use serde::{Deserialize, Serialize};

/// Models offered in the settings dialog
pub const AVAILABLE_MODELS: &[&str] = &[
    "google/gemini-2.0-flash-exp:free",
    "google/gemini-exp-1206:free",
    "google/gemini-exp-1121:free",
    "google/learnlm-1.5-pro-experimental:free",
    "google/gemini-exp-1114:free",
    "google/gemini-2.0-flash-thinking-exp:free",
];

/// Settings keys as stored in the `settings` table
pub const OPENROUTER_KEY_SETTING: &str = "openrouter_key";
pub const MODEL_SETTING: &str = "model";
pub const THEME_SETTING: &str = "theme";

/// Environment variables that override stored settings
pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const MODEL_ENV: &str = "TAI_CHAT_MODEL";

/// A single setting stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub value_type: String,
    pub updated_at: String,
}

/// Color theme preference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    /// Parse a stored theme; unknown values yield `None` so callers can fall back
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }
}

/// Everything the settings dialog edits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppSettings {
    /// OpenRouter API key; empty when not configured
    pub openrouter_key: String,
    pub model: String,
    pub theme: Theme,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            openrouter_key: String::new(),
            model: AVAILABLE_MODELS[0].to_string(),
            theme: Theme::System,
        }
    }
}

impl AppSettings {
    /// The API key, if one is configured
    pub fn credential(&self) -> Option<&str> {
        let key = self.openrouter_key.trim();
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }

    /// Apply `OPENROUTER_API_KEY` / `TAI_CHAT_MODEL` when set and non-empty
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(key) = std::env::var(OPENROUTER_KEY_ENV).ok().filter(|v| !v.trim().is_empty()) {
            self.openrouter_key = key;
        }
        if let Some(model) = std::env::var(MODEL_ENV).ok().filter(|v| !v.trim().is_empty()) {
            self.model = model;
        }
        self
    }
}
