//! Income sheet model
//!
//! A sheet is one income event (a paycheck, a client payment) that expenses
//! are recorded against.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{SheetId, UserId};
use super::money::Money;
use super::{check_text, ModelError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeSheet {
    pub id: SheetId,
    pub owner: UserId,
    pub name: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl IncomeSheet {
    pub fn new(owner: UserId, name: impl Into<String>, amount: Money, date: NaiveDate) -> Self {
        Self {
            id: SheetId::new(),
            owner,
            name: name.into().trim().to_string(),
            amount,
            date,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        check_text("Sheet name", &self.name)?;
        if self.amount.is_negative() {
            return Err(ModelError::Negative("Income amount"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_new_trims_name() {
        let sheet = IncomeSheet::new(UserId::new(), "  March pay ", Money::from_cents(250000), date());
        assert_eq!(sheet.name, "March pay");
        assert!(sheet.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let owner = UserId::new();
        let blank = IncomeSheet::new(owner, " ", Money::from_cents(1), date());
        assert_eq!(blank.validate(), Err(ModelError::Empty("Sheet name")));

        let negative = IncomeSheet::new(owner, "Pay", Money::from_cents(-1), date());
        assert_eq!(negative.validate(), Err(ModelError::Negative("Income amount")));

        // A zero-amount sheet is allowed (e.g. a placeholder for a late payment).
        assert!(IncomeSheet::new(owner, "Pay", Money::ZERO, date()).validate().is_ok());
    }

    #[test]
    fn test_serializes_camel_case() {
        let sheet = IncomeSheet::new(UserId::new(), "Pay", Money::from_cents(100), date());
        let json = serde_json::to_value(&sheet).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["date"], "2025-03-01");
        assert_eq!(json["amount"], 100);
    }
}
