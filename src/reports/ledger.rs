//! Income sheet balances
//!
//! Derived on demand from the raw `incomeSheets` and `expenses` state slices;
//! nothing here is stored.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{Expense, IncomeSheet, Money, SheetId};

/// One sheet's income against what has been spent from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSummary {
    pub sheet_id: SheetId,
    pub name: String,
    pub date: NaiveDate,
    pub income: Money,
    pub total_expenses: Money,
    /// Income minus expenses; negative when overspent
    pub balance: Money,
    pub expense_count: usize,
}

impl SheetSummary {
    /// Summarize `sheet`, counting only the expenses recorded against it
    pub fn compute(sheet: &IncomeSheet, expenses: &[Expense]) -> Self {
        Self::from_own(sheet, expenses.iter().filter(|e| e.sheet_id == sheet.id))
    }

    fn from_own<'a>(sheet: &IncomeSheet, own: impl Iterator<Item = &'a Expense>) -> Self {
        let (total_expenses, expense_count) = own.fold((Money::ZERO, 0), |(sum, n), e| (sum + e.amount, n + 1));
        Self {
            sheet_id: sheet.id,
            name: sheet.name.clone(),
            date: sheet.date,
            income: sheet.amount,
            total_expenses,
            balance: sheet.amount - total_expenses,
            expense_count,
        }
    }

    pub fn is_overspent(&self) -> bool {
        self.balance.is_negative()
    }
}

/// Every sheet of one user plus the totals across them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOverview {
    /// In the order the sheets were given
    pub sheets: Vec<SheetSummary>,
    pub total_income: Money,
    pub total_expenses: Money,
    pub balance: Money,
    pub overspent_count: usize,
}

impl LedgerOverview {
    pub fn compute(sheets: &[IncomeSheet], expenses: &[Expense]) -> Self {
        let mut by_sheet: HashMap<SheetId, Vec<&Expense>> = HashMap::new();
        for expense in expenses {
            by_sheet.entry(expense.sheet_id).or_default().push(expense);
        }

        let summaries: Vec<SheetSummary> = sheets
            .iter()
            .map(|sheet| {
                let own = by_sheet.get(&sheet.id).map(Vec::as_slice).unwrap_or_default();
                SheetSummary::from_own(sheet, own.iter().copied())
            })
            .collect();

        let total_income: Money = summaries.iter().map(|s| s.income).sum();
        let total_expenses: Money = summaries.iter().map(|s| s.total_expenses).sum();
        Self {
            overspent_count: summaries.iter().filter(|s| s.is_overspent()).count(),
            balance: total_income - total_expenses,
            total_income,
            total_expenses,
            sheets: summaries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn fixture() -> (Vec<IncomeSheet>, Vec<Expense>) {
        let owner = UserId::new();
        let pay = IncomeSheet::new(owner, "Pay", Money::from_cents(200000), day(1));
        let bonus = IncomeSheet::new(owner, "Bonus", Money::from_cents(10000), day(15));
        let expenses = vec![
            Expense::new(pay.id, "Rent", Money::from_cents(120000), day(2)),
            Expense::new(pay.id, "Food", Money::from_cents(30000), day(3)),
            Expense::new(bonus.id, "Gadget", Money::from_cents(15000), day(16)),
        ];
        (vec![pay, bonus], expenses)
    }

    #[test]
    fn test_sheet_summary_counts_only_its_expenses() {
        let (sheets, expenses) = fixture();
        let summary = SheetSummary::compute(&sheets[0], &expenses);

        assert_eq!(summary.total_expenses.cents(), 150000);
        assert_eq!(summary.balance.cents(), 50000);
        assert_eq!(summary.expense_count, 2);
        assert!(!summary.is_overspent());
    }

    #[test]
    fn test_overview_totals_and_overspending() {
        let (sheets, expenses) = fixture();
        let overview = LedgerOverview::compute(&sheets, &expenses);

        assert_eq!(overview.total_income.cents(), 210000);
        assert_eq!(overview.total_expenses.cents(), 165000);
        assert_eq!(overview.balance.cents(), 45000);
        assert_eq!(overview.overspent_count, 1);
        assert_eq!(overview.sheets[1].balance.cents(), -5000);
    }

    #[test]
    fn test_orphan_expenses_are_ignored() {
        let (sheets, mut expenses) = fixture();
        expenses.push(Expense::new(SheetId::new(), "Orphan", Money::from_cents(999), day(9)));
        let overview = LedgerOverview::compute(&sheets, &expenses);
        assert_eq!(overview.total_expenses.cents(), 165000);
    }

    #[test]
    fn test_empty_overview() {
        let overview = LedgerOverview::compute(&[], &[]);
        assert!(overview.is_empty());
        assert_eq!(overview.balance, Money::ZERO);
    }
}
