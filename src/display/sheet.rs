//! Income sheet views

use crate::models::{Expense, Money};
use crate::reports::{LedgerOverview, SheetSummary};

use super::{amount, column_width};

/// All sheets with their balances and a totals row
pub fn format_sheet_list(overview: &LedgerOverview, symbol: &str) -> String {
    if overview.is_empty() {
        return "No income sheets yet. Add one with `sheetbook sheet add`.".to_string();
    }

    let name_width = column_width(overview.sheets.iter().map(|s| s.name.as_str()), "Name");

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<10}  {:<name_width$}  {:>12}  {:>12}  {:>12}\n",
        "ID",
        "Date",
        "Name",
        "Income",
        "Spent",
        "Balance",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<12}  {:-<10}  {:-<name_width$}  {:->12}  {:->12}  {:->12}\n",
        "",
        "",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for sheet in &overview.sheets {
        let marker = if sheet.is_overspent() { " !" } else { "" };
        output.push_str(&format!(
            "{:<12}  {:<10}  {:<name_width$}  {:>12}  {:>12}  {:>12}{}\n",
            sheet.sheet_id.to_string(),
            sheet.date.to_string(),
            sheet.name,
            amount(sheet.income, symbol),
            amount(sheet.total_expenses, symbol),
            amount(sheet.balance, symbol),
            marker,
            name_width = name_width,
        ));
    }

    output.push_str(&format!(
        "{:<12}  {:<10}  {:<name_width$}  {:>12}  {:>12}  {:>12}\n",
        "",
        "",
        "Total",
        amount(overview.total_income, symbol),
        amount(overview.total_expenses, symbol),
        amount(overview.balance, symbol),
        name_width = name_width,
    ));

    if overview.overspent_count > 0 {
        output.push_str(&format!(
            "\n! {} sheet(s) overspent\n",
            overview.overspent_count
        ));
    }
    output
}

/// One sheet with its expenses, oldest first
pub fn format_sheet_details(summary: &SheetSummary, expenses: &[Expense], symbol: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("{} ({})\n", summary.name, summary.sheet_id));
    output.push_str(&format!("Date:     {}\n", summary.date));
    output.push_str(&format!("Income:   {:>12}\n", amount(summary.income, symbol)));
    output.push_str(&format!("Spent:    {:>12}\n", amount(summary.total_expenses, symbol)));
    output.push_str(&format!("Balance:  {:>12}\n", amount(summary.balance, symbol)));

    let own: Vec<&Expense> = expenses
        .iter()
        .filter(|e| e.sheet_id == summary.sheet_id)
        .collect();
    if own.is_empty() {
        output.push_str("\nNo expenses recorded.\n");
        return output;
    }

    let desc_width = column_width(own.iter().map(|e| e.description.as_str()), "Description");
    output.push('\n');
    output.push_str(&format!(
        "{:<12}  {:<10}  {:<desc_width$}  {:>12}\n",
        "ID",
        "Date",
        "Description",
        "Amount",
        desc_width = desc_width,
    ));
    for expense in &own {
        output.push_str(&format!(
            "{:<12}  {:<10}  {:<desc_width$}  {:>12}\n",
            expense.id.to_string(),
            expense.date.to_string(),
            expense.description,
            amount(expense.amount, symbol),
            desc_width = desc_width,
        ));
    }

    let share = share_of(summary.total_expenses, summary.income);
    output.push_str(&format!("\n{} expense(s), {}% of income\n", own.len(), share));
    output
}

fn share_of(part: Money, whole: Money) -> i64 {
    if whole.is_positive() {
        part.cents() * 100 / whole.cents()
    } else {
        0
    }
}
