//! Debt views

use crate::models::Debt;
use crate::reports::{DebtOverview, DebtSummary};

use super::{amount, column_width};

pub fn format_debt_list(overview: &DebtOverview, symbol: &str) -> String {
    if overview.is_empty() {
        return "No debts tracked. Add one with `sheetbook debt add`.".to_string();
    }

    let creditor_width = column_width(
        overview.debts.iter().map(|d| d.creditor.as_str()),
        "Creditor",
    );

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<creditor_width$}  {:>12}  {:>12}  {:>12}  {}\n",
        "ID",
        "Creditor",
        "Amount",
        "Paid",
        "Remaining",
        "Status",
        creditor_width = creditor_width,
    ));
    output.push_str(&format!(
        "{:-<12}  {:-<creditor_width$}  {:->12}  {:->12}  {:->12}  {:-<8}\n",
        "",
        "",
        "",
        "",
        "",
        "",
        creditor_width = creditor_width,
    ));

    for debt in &overview.debts {
        let status = if debt.settled {
            "Settled".to_string()
        } else {
            format!("{}%", debt.percent_paid())
        };
        output.push_str(&format!(
            "{:<12}  {:<creditor_width$}  {:>12}  {:>12}  {:>12}  {}\n",
            debt.debt_id.to_string(),
            debt.creditor,
            amount(debt.amount, symbol),
            amount(debt.paid, symbol),
            amount(debt.remaining, symbol),
            status,
            creditor_width = creditor_width,
        ));
    }

    output.push_str(&format!(
        "\nOpen: {}  Settled: {}  Still owed: {}\n",
        overview.open_count,
        overview.settled_count,
        amount(overview.total_remaining, symbol)
    ));
    output
}

pub fn format_debt_details(debt: &Debt, summary: &DebtSummary, symbol: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("{} ({})\n", debt.creditor, debt.id));
    output.push_str(&format!("Since:      {}\n", debt.date));
    output.push_str(&format!("Amount:     {:>12}\n", amount(summary.amount, symbol)));
    output.push_str(&format!("Paid:       {:>12}\n", amount(summary.paid, symbol)));
    output.push_str(&format!("Remaining:  {:>12}\n", amount(summary.remaining, symbol)));
    if summary.settled {
        output.push_str("Status:     Settled\n");
    }
    if !debt.notes.trim().is_empty() {
        output.push_str(&format!("Notes:      {}\n", debt.notes.trim()));
    }

    if debt.payments.is_empty() {
        output.push_str("\nNo payments recorded.\n");
        return output;
    }

    output.push_str(&format!("\n{:<12}  {:<10}  {:>12}\n", "Payment", "Date", "Amount"));
    let mut payments: Vec<_> = debt.payments.iter().collect();
    payments.sort_by_key(|p| p.date);
    for payment in payments {
        output.push_str(&format!(
            "{:<12}  {:<10}  {:>12}\n",
            payment.id.to_string(),
            payment.date.to_string(),
            amount(payment.amount, symbol)
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, UserId};
    use chrono::NaiveDate;

    fn debt() -> Debt {
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let mut debt = Debt::new(UserId::new(), "Credit union", Money::from_cents(20000), date)
            .with_notes("car repair");
        debt.record_payment(Money::from_cents(5000), date).unwrap();
        debt
    }

    #[test]
    fn test_list_shows_progress() {
        let text = format_debt_list(&DebtOverview::compute(&[debt()]), "$");
        assert!(text.contains("Credit union"));
        assert!(text.contains("25%"));
        assert!(text.contains("Still owed: $150.00"));
    }

    #[test]
    fn test_details_show_payments_and_notes() {
        let debt = debt();
        let text = format_debt_details(&debt, &DebtSummary::compute(&debt), "$");
        assert!(text.contains("Notes:      car repair"));
        assert!(text.contains("$50.00"));
        assert!(!text.contains("Settled"));
    }

    #[test]
    fn test_empty_list_hint() {
        assert!(format_debt_list(&DebtOverview::compute(&[]), "$").contains("No debts"));
    }
}
