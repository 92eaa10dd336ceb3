//! CLI command handlers
//!
//! Bridges clap argument parsing with the running [`App`]. Views are
//! produced by navigating to a route and printing what the app renders.

pub mod auth;
pub mod debt;
pub mod sheet;

pub use auth::{handle_login, handle_logout, handle_register, handle_whoami};
pub use debt::{handle_debt_command, DebtCommands};
pub use sheet::{handle_expense_command, handle_sheet_command, ExpenseCommands, SheetCommands};

use chrono::{Local, NaiveDate};

use crate::app::App;
use crate::config::settings::Settings;
use crate::error::{SheetbookError, SheetbookResult};

/// Resolve `route` (or the last visited one) and print the result
pub async fn handle_open(app: &App, route: Option<String>) -> SheetbookResult<()> {
    match route {
        Some(route) => app.navigate(&route).await?,
        None => app.resume().await?,
    };
    print_view(app)
}

pub(crate) async fn show_route(app: &App, route: &str) -> SheetbookResult<()> {
    app.navigate(route).await?;
    print_view(app)
}

fn print_view(app: &App) -> SheetbookResult<()> {
    let view = app.render()?;
    if !view.is_empty() {
        println!("{}", view.trim_end());
    }
    Ok(())
}

/// Parse a date in ISO form or the configured format; today when absent
pub(crate) fn parse_date(input: Option<&str>, settings: &Settings) -> SheetbookResult<NaiveDate> {
    let Some(input) = input.map(str::trim) else {
        return Ok(Local::now().date_naive());
    };

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, &settings.date_format))
        .map_err(|_| {
            SheetbookError::Validation(format!(
                "Invalid date: '{}'. Use YYYY-MM-DD or {}",
                input, settings.date_format
            ))
        })
}
