//! Domain models for income sheets, expenses, debts and user sessions
//!
//! Every model serializes with camelCase field names because the same
//! values live in the application state tree.

pub mod debt;
pub mod expense;
pub mod ids;
pub mod income_sheet;
pub mod money;
pub mod state;
pub mod user;

pub use debt::{Debt, Payment};
pub use expense::Expense;
pub use ids::{DebtId, ExpenseId, PaymentId, SheetId, UserId};
pub use income_sheet::IncomeSheet;
pub use money::{Money, MoneyParseError};
pub use state::{StateShape, UiState};
pub use user::{User, UserSession};

/// Longest accepted name, description or creditor
pub const MAX_TEXT_LEN: usize = 120;

/// A model field failed validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("{0} cannot be negative")]
    Negative(&'static str),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("{0} must be at least {1} characters")]
    TooShort(&'static str, usize),

    #[error("{0} is not valid")]
    Invalid(&'static str),

    #[error("{0} is too long (max {max} characters)", max = MAX_TEXT_LEN)]
    TooLong(&'static str),
}

pub(crate) fn check_text(field: &'static str, value: &str) -> Result<(), ModelError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ModelError::Empty(field));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ModelError::TooLong(field));
    }
    Ok(())
}
