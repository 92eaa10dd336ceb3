//! Debt commands

use clap::Subcommand;

use crate::app::App;
use crate::error::SheetbookResult;
use crate::models::Money;

use super::{parse_date, show_route};

#[derive(Subcommand)]
pub enum DebtCommands {
    /// List debts with repayment progress
    List,
    /// Start tracking a debt
    Add {
        /// Who the money is owed to
        creditor: String,
        /// Amount owed (e.g. "1200.00")
        amount: String,
        /// Date the debt started (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Record a payment towards a debt
    Pay {
        /// Debt ID (short or full)
        debt: String,
        /// Amount paid
        amount: String,
        /// Payment date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Show one debt with its payments
    Show {
        /// Debt ID (short or full)
        debt: String,
    },
    /// Stop tracking a debt
    Remove {
        /// Debt ID (short or full)
        debt: String,
    },
}

pub async fn handle_debt_command(app: &App, cmd: DebtCommands) -> SheetbookResult<()> {
    let symbol = app.settings().currency_symbol.clone();

    match cmd {
        DebtCommands::List => show_route(app, "/debts").await?,

        DebtCommands::Add {
            creditor,
            amount,
            date,
            notes,
        } => {
            let amount = Money::parse(&amount)?;
            let date = parse_date(date.as_deref(), app.settings())?;
            let debt = app
                .debts()
                .add_debt(&creditor, amount, date, notes.as_deref())
                .await?;

            println!("Tracking debt to {}", debt.creditor);
            println!("  Amount: {}", debt.amount.format_with_symbol(&symbol));
            println!("  ID: {}", debt.id);
        }

        DebtCommands::Pay { debt, amount, date } => {
            let amount = Money::parse(&amount)?;
            let date = parse_date(date.as_deref(), app.settings())?;
            let updated = app.debts().record_payment(&debt, amount, date).await?;

            println!(
                "Paid {} to {}",
                amount.format_with_symbol(&symbol),
                updated.creditor
            );
            if updated.is_settled() {
                println!("  Debt settled!");
            } else {
                println!(
                    "  Remaining: {}",
                    updated.remaining().format_with_symbol(&symbol)
                );
            }
        }

        DebtCommands::Show { debt } => {
            show_route(app, &format!("/debt/{}", debt.trim())).await?;
        }

        DebtCommands::Remove { debt } => {
            let removed = app.debts().remove_debt(&debt).await?;
            println!("Stopped tracking debt to {} ({})", removed.creditor, removed.id);
        }
    }

    Ok(())
}
