//! Debt model with partial payments
//!
//! A debt is an amount owed to a creditor. Payments are recorded against it
//! until the paid total reaches the amount; overpayment is allowed and the
//! remaining balance never goes below zero.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DebtId, PaymentId, UserId};
use super::money::Money;
use super::{check_text, ModelError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub amount: Money,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub id: DebtId,
    pub owner: UserId,
    pub creditor: String,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub payments: Vec<Payment>,
    pub created_at: DateTime<Utc>,
}

impl Debt {
    pub fn new(owner: UserId, creditor: impl Into<String>, amount: Money, date: NaiveDate) -> Self {
        Self {
            id: DebtId::new(),
            owner,
            creditor: creditor.into().trim().to_string(),
            amount,
            date,
            notes: String::new(),
            payments: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        check_text("Creditor", &self.creditor)?;
        if !self.amount.is_positive() {
            return Err(ModelError::NotPositive("Debt amount"));
        }
        Ok(())
    }

    /// Sum of every recorded payment
    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// Amount still owed, clamped at zero
    pub fn remaining(&self) -> Money {
        (self.amount - self.total_paid()).at_least_zero()
    }

    pub fn is_settled(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Append a payment and return its id
    pub fn record_payment(&mut self, amount: Money, date: NaiveDate) -> Result<PaymentId, ModelError> {
        if !amount.is_positive() {
            return Err(ModelError::NotPositive("Payment amount"));
        }
        let id = PaymentId::new();
        self.payments.push(Payment { id, amount, date });
        Ok(id)
    }

    pub fn remove_payment(&mut self, id: PaymentId) -> bool {
        let before = self.payments.len();
        self.payments.retain(|p| p.id != id);
        self.payments.len() != before
    }
}
