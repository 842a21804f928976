//! Settings dialog commands

use crate::database::AppSettings;
use crate::state::AppState;
use super::types::ChatError;

/// Load the settings dialog values; falls back to defaults, never fails
pub async fn load_settings(state: &AppState) -> AppSettings {
    state.settings_store().load_settings().await
}

/// Save the settings dialog values
pub async fn save_settings(state: &AppState, settings: AppSettings) -> Result<(), ChatError> {
    if settings.model.trim().is_empty() {
        return Err(ChatError::InvalidInput("Model must not be empty".to_string()));
    }

    let settings = AppSettings {
        openrouter_key: settings.openrouter_key.trim().to_string(),
        model: settings.model.trim().to_string(),
        theme: settings.theme,
    };
    state.settings_store().save_settings(&settings).await?;
    log::info!("Settings saved (model: {}, theme: {})", settings.model, settings.theme.as_str());
    Ok(())
}
