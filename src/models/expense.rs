//! Expense model: money spent out of one income sheet

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ExpenseId, SheetId};
use super::money::Money;
use super::{check_text, ModelError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    pub sheet_id: SheetId,
    pub description: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        sheet_id: SheetId,
        description: impl Into<String>,
        amount: Money,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: ExpenseId::new(),
            sheet_id,
            description: description.into().trim().to_string(),
            amount,
            date,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        check_text("Expense description", &self.description)?;
        if !self.amount.is_positive() {
            return Err(ModelError::NotPositive("Expense amount"));
        }
        Ok(())
    }
}
