//! Path management for Sheetbook
//!
//! ## Path Resolution Order
//!
//! 1. `SHEETBOOK_DATA_DIR` environment variable (if set)
//! 2. The platform config directory (`~/.config/sheetbook` on Linux,
//!    `~/Library/Application Support/sheetbook` on macOS, `%APPDATA%` on Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::SheetbookError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "SHEETBOOK_DATA_DIR";

/// Manages all paths used by Sheetbook
#[derive(Debug, Clone)]
pub struct SheetbookPaths {
    base_dir: PathBuf,
}

impl SheetbookPaths {
    /// Resolve the base directory from the environment or the platform default
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, SheetbookError> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) if !custom.trim().is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create paths rooted at a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Directory holding the local data backend (sheets, debts, users)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Directory holding persisted application state blobs
    pub fn state_dir(&self) -> PathBuf {
        self.base_dir.join("state")
    }

    pub fn sheets_file(&self) -> PathBuf {
        self.data_dir().join("sheets.json")
    }

    pub fn debts_file(&self) -> PathBuf {
        self.data_dir().join("debts.json")
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir().join("users.json")
    }

    /// Ensure the base, data and state directories exist
    pub fn ensure_directories(&self) -> Result<(), SheetbookError> {
        for dir in [self.base_dir.clone(), self.data_dir(), self.state_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                SheetbookError::Io(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

fn resolve_default_path() -> Result<PathBuf, SheetbookError> {
    ProjectDirs::from("", "", "sheetbook")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| SheetbookError::Config("Could not determine a home directory".into()))
}
