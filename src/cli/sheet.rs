//! Income sheet and expense commands

use clap::Subcommand;

use crate::app::App;
use crate::error::SheetbookResult;
use crate::models::Money;

use super::{parse_date, show_route};

#[derive(Subcommand)]
pub enum SheetCommands {
    /// List income sheets with their balances
    List,
    /// Create an income sheet
    Add {
        /// Sheet name (e.g. "October salary")
        name: String,
        /// Income amount (e.g. "2500.00")
        amount: String,
        /// Date received (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Show one sheet with its expenses
    Show {
        /// Sheet ID (short or full)
        sheet: String,
    },
    /// Delete a sheet and its expenses
    Remove {
        /// Sheet ID (short or full)
        sheet: String,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense against a sheet
    Add {
        /// Sheet ID (short or full)
        sheet: String,
        /// What the money was spent on
        description: String,
        /// Amount spent (e.g. "42.50")
        amount: String,
        /// Date spent (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Delete an expense
    Remove {
        /// Expense ID (short or full)
        expense: String,
    },
}

pub async fn handle_sheet_command(app: &App, cmd: SheetCommands) -> SheetbookResult<()> {
    match cmd {
        SheetCommands::List => show_route(app, "/sheets").await?,

        SheetCommands::Add { name, amount, date } => {
            let amount = Money::parse(&amount)?;
            let date = parse_date(date.as_deref(), app.settings())?;
            let sheet = app.money().create_sheet(&name, amount, date).await?;

            println!("Created income sheet: {}", sheet.name);
            println!(
                "  Amount: {}",
                sheet.amount.format_with_symbol(&app.settings().currency_symbol)
            );
            println!("  Date: {}", sheet.date);
            println!("  ID: {}", sheet.id);
        }

        SheetCommands::Show { sheet } => {
            show_route(app, &format!("/sheet/{}", sheet.trim())).await?;
        }

        SheetCommands::Remove { sheet } => {
            let removed = app.money().remove_sheet(&sheet).await?;
            println!("Removed income sheet: {} ({})", removed.name, removed.id);
        }
    }

    Ok(())
}

pub async fn handle_expense_command(app: &App, cmd: ExpenseCommands) -> SheetbookResult<()> {
    match cmd {
        ExpenseCommands::Add {
            sheet,
            description,
            amount,
            date,
        } => {
            let amount = Money::parse(&amount)?;
            let date = parse_date(date.as_deref(), app.settings())?;
            let expense = app
                .money()
                .add_expense(&sheet, &description, amount, date)
                .await?;

            println!(
                "Added expense: {} {} ({})",
                expense.description,
                expense
                    .amount
                    .format_with_symbol(&app.settings().currency_symbol),
                expense.id
            );
        }

        ExpenseCommands::Remove { expense } => {
            let removed = app.money().remove_expense(&expense).await?;
            println!("Removed expense: {} ({})", removed.description, removed.id);
        }
    }

    Ok(())
}
