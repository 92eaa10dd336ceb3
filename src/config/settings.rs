//! User settings for Sheetbook
//!
//! Every field has a serde default, so older or hand-edited config files
//! load without error.

use serde::{Deserialize, Serialize};

use super::paths::SheetbookPaths;
use crate::error::SheetbookError;

/// User settings for Sheetbook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Currency symbol used when rendering amounts
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Date format preference (strftime format)
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Durable storage key for the persisted state subset
    #[serde(default = "default_state_key")]
    pub state_key: String,

    /// Top-level state fields written to durable storage
    #[serde(default = "default_persisted_fields")]
    pub persisted_fields: Vec<String>,

    /// Object members stripped from anything written to durable storage
    #[serde(default = "default_redacted_fields")]
    pub redacted_fields: Vec<String>,

    /// Route opened when no location is given
    #[serde(default = "default_route")]
    pub default_route: String,

    /// Log filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_state_key() -> String {
    "sheetbook-state".to_string()
}

fn default_persisted_fields() -> Vec<String> {
    vec!["user".to_string(), "ui".to_string()]
}

fn default_redacted_fields() -> Vec<String> {
    vec!["password".to_string(), "passwordHash".to_string()]
}

fn default_route() -> String {
    "/sheets".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            currency_symbol: default_currency(),
            date_format: default_date_format(),
            state_key: default_state_key(),
            persisted_fields: default_persisted_fields(),
            redacted_fields: default_redacted_fields(),
            default_route: default_route(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or fall back to defaults if the file doesn't exist
    pub fn load_or_create(paths: &SheetbookPaths) -> Result<Self, SheetbookError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| SheetbookError::Io(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| SheetbookError::Config(format!("Failed to parse settings file: {}", e)))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &SheetbookPaths) -> Result<(), SheetbookError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| SheetbookError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| SheetbookError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
