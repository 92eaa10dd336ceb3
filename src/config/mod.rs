//! Configuration module for Sheetbook
//!
//! - Platform-aware path resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::SheetbookPaths;
pub use settings::Settings;
