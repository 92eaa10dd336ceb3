//! Custom error types for Sheetbook
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for Sheetbook operations
#[derive(Error, Debug)]
pub enum SheetbookError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Bad input shape (module records, state paths, model fields)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A module declared dependencies that are not registered yet
    #[error("Module '{module}' is missing dependencies: {}", missing.join(", "))]
    Dependency { module: String, missing: Vec<String> },

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Durable storage failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// A listener failed during dispatch
    #[error("Handler error on '{topic}': {message}")]
    Handler { topic: String, message: String },

    /// A module lifecycle hook failed
    #[error("Module '{id}' failed during {phase}: {message}")]
    Module {
        id: String,
        phase: &'static str,
        message: String,
    },

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A route handler gave way to a newer transition
    #[error("Navigation to '{0}' was superseded")]
    Superseded(String),
}

impl SheetbookError {
    /// Create a "not found" error for modules
    pub fn module_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Module",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for routes
    pub fn route_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Route",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for income sheets
    pub fn sheet_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Income sheet",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for expenses
    pub fn expense_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Expense",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for debts
    pub fn debt_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Debt",
            identifier: identifier.into(),
        }
    }

    /// Create a module hook failure
    pub fn module_failed(id: impl Into<String>, phase: &'static str, err: anyhow::Error) -> Self {
        Self::Module {
            id: id.into(),
            phase,
            message: format!("{:#}", err),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if a route handler gave way to a newer transition
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded(_))
    }

    /// Check if this is a dependency error
    pub fn is_dependency(&self) -> bool {
        matches!(self, Self::Dependency { .. })
    }
}

impl From<std::io::Error> for SheetbookError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SheetbookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<crate::models::ModelError> for SheetbookError {
    fn from(err: crate::models::ModelError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<crate::models::MoneyParseError> for SheetbookError {
    fn from(err: crate::models::MoneyParseError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for Sheetbook operations
pub type SheetbookResult<T> = Result<T, SheetbookError>;
