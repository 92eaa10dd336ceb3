//! Income sheets and their expenses
//!
//! Owns the `incomeSheets` and `expenses` slices. Every write goes to the
//! data API first; state is only updated once the API accepted it, and the
//! updated slice is written back whole so path listeners fire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info};

use crate::core::{Module, RouteMatch};
use crate::display::{format_sheet_details, format_sheet_list};
use crate::error::{SheetbookError, SheetbookResult};
use crate::models::state::paths;
use crate::models::{Expense, IncomeSheet, Money, SheetId};
use crate::reports::{LedgerOverview, SheetSummary};

use super::{
    find_unique, invalidate_on, FeatureContext, ViewCache, Watches, AUTH_LOGIN, AUTH_LOGOUT,
};

pub const SHEETS_ROUTE: &str = "/sheets";
pub const SHEET_ROUTE: &str = "/sheet/:id";

pub struct MoneyModule {
    ctx: FeatureContext,
    view: Arc<ViewCache>,
    watches: Watches,
    stale: AtomicBool,
}

impl MoneyModule {
    pub fn new(ctx: FeatureContext) -> Self {
        Self {
            ctx,
            view: Arc::new(ViewCache::default()),
            watches: Watches::default(),
            stale: AtomicBool::new(true),
        }
    }

    /// Sheets currently in state, newest first
    pub fn sheets(&self) -> Vec<IncomeSheet> {
        self.ctx
            .state
            .get_as(paths::INCOME_SHEETS)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    pub fn expenses(&self) -> Vec<Expense> {
        self.ctx
            .state
            .get_as(paths::EXPENSES)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    pub fn selected_sheet(&self) -> Option<SheetId> {
        self.ctx.state.get_as(paths::SELECTED_SHEET).ok().flatten()
    }

    /// Reload both slices from the data API
    pub async fn refresh(&self) -> SheetbookResult<()> {
        let (sheets, expenses) = match self.ctx.current_user() {
            Some(user) => (
                self.ctx.api.list_sheets(user.user_id).await?,
                self.ctx.api.list_expenses(user.user_id).await?,
            ),
            None => (Vec::new(), Vec::new()),
        };
        debug!(sheets = sheets.len(), expenses = expenses.len(), "Loaded income sheets");
        self.store(&sheets, &expenses)?;
        self.stale.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub async fn ensure_loaded(&self) -> SheetbookResult<()> {
        if self.stale.load(Ordering::SeqCst) {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Resolve a short or full sheet id
    pub fn find_sheet(&self, input: &str) -> SheetbookResult<IncomeSheet> {
        let sheets = self.sheets();
        find_unique(
            &sheets,
            input,
            |sheet, input| sheet.id.matches(input),
            || SheetbookError::sheet_not_found(input.trim()),
        )
        .cloned()
    }

    pub async fn create_sheet(
        &self,
        name: &str,
        amount: Money,
        date: NaiveDate,
    ) -> SheetbookResult<IncomeSheet> {
        let user = self.ctx.require_user()?;
        let sheet = IncomeSheet::new(user.user_id, name, amount, date);
        sheet.validate()?;
        self.ensure_loaded().await?;

        let created = self.ctx.api.create_sheet(sheet).await?;
        let mut sheets = self.sheets();
        sheets.push(created.clone());
        sort_sheets(&mut sheets);
        self.ctx.state.set_as(paths::INCOME_SHEETS, &sheets)?;

        info!(sheet = %created.id, name = %created.name, "Income sheet created");
        Ok(created)
    }

    /// Remove a sheet with its expenses
    pub async fn remove_sheet(&self, input: &str) -> SheetbookResult<IncomeSheet> {
        let user = self.ctx.require_user()?;
        self.ensure_loaded().await?;
        let sheet = self.find_sheet(input)?;

        self.ctx.api.delete_sheet(user.user_id, sheet.id).await?;

        let sheets: Vec<IncomeSheet> = self.sheets().into_iter().filter(|s| s.id != sheet.id).collect();
        let expenses: Vec<Expense> = self
            .expenses()
            .into_iter()
            .filter(|e| e.sheet_id != sheet.id)
            .collect();
        self.store(&sheets, &expenses)?;
        if self.selected_sheet() == Some(sheet.id) {
            self.ctx.state.set_state(paths::SELECTED_SHEET, Value::Null)?;
        }

        info!(sheet = %sheet.id, "Income sheet removed");
        Ok(sheet)
    }

    pub async fn add_expense(
        &self,
        sheet: &str,
        description: &str,
        amount: Money,
        date: NaiveDate,
    ) -> SheetbookResult<Expense> {
        let user = self.ctx.require_user()?;
        self.ensure_loaded().await?;
        let sheet = self.find_sheet(sheet)?;
        let expense = Expense::new(sheet.id, description, amount, date);
        expense.validate()?;

        let created = self.ctx.api.create_expense(user.user_id, expense).await?;
        let mut expenses = self.expenses();
        expenses.push(created.clone());
        expenses.sort_by_key(|e| (e.date, e.created_at));
        self.ctx.state.set_as(paths::EXPENSES, &expenses)?;

        info!(expense = %created.id, sheet = %sheet.id, amount = %created.amount, "Expense added");
        Ok(created)
    }

    pub async fn remove_expense(&self, input: &str) -> SheetbookResult<Expense> {
        let user = self.ctx.require_user()?;
        self.ensure_loaded().await?;
        let mut expenses = self.expenses();
        let expense = find_unique(
            &expenses,
            input,
            |expense, input| expense.id.matches(input),
            || SheetbookError::expense_not_found(input.trim()),
        )?
        .clone();

        self.ctx.api.delete_expense(user.user_id, expense.id).await?;
        expenses.retain(|e| e.id != expense.id);
        self.ctx.state.set_as(paths::EXPENSES, &expenses)?;

        info!(expense = %expense.id, "Expense removed");
        Ok(expense)
    }

    fn store(&self, sheets: &[IncomeSheet], expenses: &[Expense]) -> SheetbookResult<()> {
        self.ctx.state.set_many(vec![
            (paths::INCOME_SHEETS, serde_json::to_value(sheets)?),
            (paths::EXPENSES, serde_json::to_value(expenses)?),
        ])?;
        Ok(())
    }

    fn render_view(&self) -> String {
        let sheets = self.sheets();
        let expenses = self.expenses();
        let symbol = self.ctx.symbol();

        let selected = self
            .selected_sheet()
            .and_then(|id| sheets.iter().find(|s| s.id == id));
        match selected {
            Some(sheet) => {
                let own: Vec<Expense> = expenses
                    .iter()
                    .filter(|e| e.sheet_id == sheet.id)
                    .cloned()
                    .collect();
                format_sheet_details(&SheetSummary::compute(sheet, &own), &own, symbol)
            }
            None => format_sheet_list(&LedgerOverview::compute(&sheets, &expenses), symbol),
        }
    }
}

fn sort_sheets(sheets: &mut [IncomeSheet]) {
    sheets.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
}

#[async_trait]
impl Module for MoneyModule {
    fn id(&self) -> &str {
        "money"
    }

    fn name(&self) -> &str {
        "Income Sheets"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["auth".to_string()]
    }

    fn routes(&self) -> Vec<String> {
        vec![SHEETS_ROUTE.to_string(), SHEET_ROUTE.to_string()]
    }

    fn events(&self) -> Vec<String> {
        vec![AUTH_LOGIN.to_string(), AUTH_LOGOUT.to_string()]
    }

    fn handle_event(&self, topic: &str, _payload: &Value) -> anyhow::Result<()> {
        debug!(topic = topic, "Income sheets marked stale");
        self.stale.store(true, Ordering::SeqCst);
        self.view.invalidate();
        Ok(())
    }

    async fn init(&self) -> anyhow::Result<()> {
        self.watches.replace(invalidate_on(
            &self.ctx.state,
            &[paths::INCOME_SHEETS, paths::EXPENSES, paths::SELECTED_SHEET],
            &self.view,
        )?);
        self.refresh().await?;
        Ok(())
    }

    async fn activate(&self) -> anyhow::Result<()> {
        self.ensure_loaded().await?;
        Ok(())
    }

    async fn on_route(&self, route: &RouteMatch) -> anyhow::Result<()> {
        let selected = match route.param("id") {
            Some(input) => Some(self.find_sheet(input)?.id),
            None => None,
        };
        self.ctx.state.set_as(paths::SELECTED_SHEET, &selected)?;
        Ok(())
    }

    fn render(&self) -> Option<String> {
        Some(self.view.get_or_render(|| self.render_view()))
    }
}
