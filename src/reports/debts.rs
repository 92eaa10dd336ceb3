//! Debt balances derived from the `debts` state slice

use chrono::NaiveDate;

use crate::models::{Debt, DebtId, Money};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtSummary {
    pub debt_id: DebtId,
    pub creditor: String,
    pub amount: Money,
    pub paid: Money,
    /// Never below zero, even when overpaid
    pub remaining: Money,
    pub payment_count: usize,
    pub last_payment: Option<NaiveDate>,
    pub settled: bool,
}

impl DebtSummary {
    pub fn compute(debt: &Debt) -> Self {
        Self {
            debt_id: debt.id,
            creditor: debt.creditor.clone(),
            amount: debt.amount,
            paid: debt.total_paid(),
            remaining: debt.remaining(),
            payment_count: debt.payments.len(),
            last_payment: debt.payments.iter().map(|p| p.date).max(),
            settled: debt.is_settled(),
        }
    }

    /// Share of the debt paid off, 0 to 100
    pub fn percent_paid(&self) -> u8 {
        if !self.amount.is_positive() {
            return 100;
        }
        let pct = (self.paid.cents().max(0) as i128 * 100) / self.amount.cents() as i128;
        pct.min(100) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtOverview {
    pub debts: Vec<DebtSummary>,
    pub total_owed: Money,
    pub total_paid: Money,
    pub total_remaining: Money,
    pub open_count: usize,
    pub settled_count: usize,
}

impl DebtOverview {
    pub fn compute(debts: &[Debt]) -> Self {
        let summaries: Vec<DebtSummary> = debts.iter().map(DebtSummary::compute).collect();
        let settled_count = summaries.iter().filter(|d| d.settled).count();
        Self {
            total_owed: summaries.iter().map(|d| d.amount).sum(),
            total_paid: summaries.iter().map(|d| d.paid).sum(),
            total_remaining: summaries.iter().map(|d| d.remaining).sum(),
            open_count: summaries.len() - settled_count,
            settled_count,
            debts: summaries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.debts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    #[test]
    fn test_summary_tracks_partial_payments() {
        let mut debt = Debt::new(UserId::new(), "Card", Money::from_cents(40000), day(1));
        debt.record_payment(Money::from_cents(10000), day(5)).unwrap();
        debt.record_payment(Money::from_cents(5000), day(3)).unwrap();

        let summary = DebtSummary::compute(&debt);
        assert_eq!(summary.paid.cents(), 15000);
        assert_eq!(summary.remaining.cents(), 25000);
        assert_eq!(summary.last_payment, Some(day(5)));
        assert_eq!(summary.percent_paid(), 37);
        assert!(!summary.settled);
    }

    #[test]
    fn test_overpaid_debt_is_settled_with_zero_remaining() {
        let mut debt = Debt::new(UserId::new(), "Friend", Money::from_cents(1000), day(1));
        debt.record_payment(Money::from_cents(1200), day(2)).unwrap();

        let summary = DebtSummary::compute(&debt);
        assert_eq!(summary.remaining, Money::ZERO);
        assert_eq!(summary.percent_paid(), 100);
        assert!(summary.settled);
    }

    #[test]
    fn test_overview_totals() {
        let owner = UserId::new();
        let mut paid_off = Debt::new(owner, "A", Money::from_cents(500), day(1));
        paid_off.record_payment(Money::from_cents(700), day(2)).unwrap();
        let open = Debt::new(owner, "B", Money::from_cents(1000), day(1));

        let overview = DebtOverview::compute(&[paid_off, open]);
        assert_eq!(overview.total_owed.cents(), 1500);
        assert_eq!(overview.total_paid.cents(), 700);
        // Overpayment on A does not reduce what is still owed on B.
        assert_eq!(overview.total_remaining.cents(), 1000);
        assert_eq!((overview.open_count, overview.settled_count), (1, 1));
    }
}
