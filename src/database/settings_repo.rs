// Settings repository for Tai Chat
// Key-value persistence behind the settings dialog

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{AppSettings, Setting, Theme, MODEL_SETTING, OPENROUTER_KEY_SETTING, THEME_SETTING};
use super::DatabaseManager;

impl DatabaseManager {
    /// Get a single setting by key
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            get_setting_impl(conn, key)
        })
    }

    /// Set a single setting
    pub fn set_setting(&self, key: &str, value: &str, value_type: &str) -> Result<()> {
        self.with_connection(|conn| {
            set_setting_impl(conn, key, value, value_type)
        })
    }

    /// Get all settings
    pub fn get_all_settings_list(&self) -> Result<Vec<Setting>> {
        self.with_connection(|conn| {
            get_all_settings_impl(conn)
        })
    }

    /// Load the dialog settings.
    ///
    /// Never fails: missing or unreadable values fall back to the defaults.
    pub fn load_app_settings(&self) -> AppSettings {
        match self.with_connection(load_app_settings_impl) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Failed to load settings, using defaults: {:#}", e);
                AppSettings::default()
            }
        }
    }

    /// Persist the dialog settings; all three values are written or none is
    pub fn save_app_settings(&self, settings: &AppSettings) -> Result<()> {
        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction()
                .context("Failed to start transaction")?;
            set_setting_impl(&tx, OPENROUTER_KEY_SETTING, &settings.openrouter_key, "secret")?;
            set_setting_impl(&tx, MODEL_SETTING, &settings.model, "string")?;
            set_setting_impl(&tx, THEME_SETTING, settings.theme.as_str(), "string")?;
            tx.commit().context("Failed to save settings")?;
            Ok(())
        })
    }
}

fn get_setting_impl(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare(
        "SELECT value FROM settings WHERE key = ?"
    ).context("Failed to prepare get_setting query")?;

    let result = stmt.query_row(params![key], |row| row.get(0));

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get setting"),
    }
}

fn set_setting_impl(conn: &Connection, key: &str, value: &str, value_type: &str) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO settings (key, value, value_type, updated_at)
        VALUES (?1, ?2, ?3, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            value_type = excluded.value_type,
            updated_at = datetime('now')
        "#,
        params![key, value, value_type],
    ).context("Failed to set setting")?;

    Ok(())
}

fn get_all_settings_impl(conn: &Connection) -> Result<Vec<Setting>> {
    let mut stmt = conn.prepare(
        "SELECT key, value, value_type, updated_at FROM settings ORDER BY key"
    ).context("Failed to prepare get_all_settings query")?;

    let settings = stmt.query_map([], |row| {
        Ok(Setting {
            key: row.get(0)?,
            value: row.get(1)?,
            value_type: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }).context("Failed to query settings")?;

    settings.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect settings")
}

fn load_app_settings_impl(conn: &Connection) -> Result<AppSettings> {
    let mut settings = AppSettings::default();

    for setting in get_all_settings_impl(conn)? {
        match setting.key.as_str() {
            OPENROUTER_KEY_SETTING => settings.openrouter_key = setting.value.trim().to_string(),
            MODEL_SETTING => {
                let model = setting.value.trim();
                if model.is_empty() {
                    log::warn!("Stored model is empty, keeping default {}", settings.model);
                } else {
                    settings.model = model.to_string();
                }
            }
            THEME_SETTING => match Theme::parse(&setting.value) {
                Some(theme) => settings.theme = theme,
                None => log::warn!("Ignoring unknown theme setting: {:?}", setting.value),
            },
            _ => {
                log::debug!("Unknown setting key: {}", setting.key);
            }
        }
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_setting() {
        let db = DatabaseManager::open_in_memory().unwrap();

        db.set_setting("test_key", "test_value", "string").unwrap();
        let value = db.get_setting("test_key").unwrap();
        assert_eq!(value, Some("test_value".to_string()));
        assert_eq!(db.get_setting("missing_key").unwrap(), None);
    }

    #[test]
    fn test_load_defaults_when_empty() {
        let db = DatabaseManager::open_in_memory().unwrap();
        assert_eq!(db.load_app_settings(), AppSettings::default());
    }

    #[test]
    fn test_save_and_load_app_settings() {
        let db = DatabaseManager::open_in_memory().unwrap();
        let settings = AppSettings {
            openrouter_key: "sk-or-test".to_string(),
            model: "google/gemini-exp-1206:free".to_string(),
            theme: Theme::Dark,
        };

        db.save_app_settings(&settings).unwrap();
        assert_eq!(db.load_app_settings(), settings);
        assert_eq!(db.get_all_settings_list().unwrap().len(), 3);
    }

    #[test]
    fn test_failed_save_leaves_previous_settings() {
        let db = DatabaseManager::open_in_memory().unwrap();
        let before = AppSettings {
            openrouter_key: "sk-or-old".to_string(),
            ..AppSettings::default()
        };
        db.save_app_settings(&before).unwrap();

        // the theme write is the last of the three
        db.with_connection(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_theme BEFORE UPDATE ON settings
                 WHEN NEW.key = 'theme'
                 BEGIN SELECT RAISE(ABORT, 'theme rejected'); END;",
            )?;
            Ok(())
        }).unwrap();

        let after = AppSettings {
            openrouter_key: "sk-or-new".to_string(),
            model: "google/gemini-exp-1206:free".to_string(),
            theme: Theme::Dark,
        };
        assert!(db.save_app_settings(&after).is_err());
        assert_eq!(db.load_app_settings(), before);
    }

    #[test]
    fn test_corrupt_values_fall_back_to_defaults() {
        let db = DatabaseManager::open_in_memory().unwrap();
        db.set_setting(THEME_SETTING, "neon", "string").unwrap();
        db.set_setting(MODEL_SETTING, "   ", "string").unwrap();
        db.set_setting(OPENROUTER_KEY_SETTING, "sk-or-kept", "secret").unwrap();

        let settings = db.load_app_settings();
        assert_eq!(settings.theme, Theme::System);
        assert_eq!(settings.model, AppSettings::default().model);
        assert_eq!(settings.openrouter_key, "sk-or-kept");
    }

    #[test]
    fn test_unreadable_table_falls_back_to_defaults() {
        let db = DatabaseManager::open_in_memory().unwrap();
        db.with_connection(|conn| {
            conn.execute("DROP TABLE settings", [])?;
            Ok(())
        }).unwrap();

        assert_eq!(db.load_app_settings(), AppSettings::default());
    }
}
