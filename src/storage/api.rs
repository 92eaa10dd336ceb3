//! Data API used by the feature modules
//!
//! Modules only talk to [`FinanceApi`]; [`LocalApi`] serves it from the JSON
//! repositories under the data directory. Every call is scoped by the owner
//! so one account can never see or change another's records.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::paths::SheetbookPaths;
use crate::error::{SheetbookError, SheetbookResult};
use crate::models::{Debt, DebtId, Expense, ExpenseId, IncomeSheet, Money, SheetId, UserId};

use super::debts::DebtRepository;
use super::sheets::SheetRepository;

#[async_trait]
pub trait FinanceApi: Send + Sync {
    async fn list_sheets(&self, owner: UserId) -> SheetbookResult<Vec<IncomeSheet>>;

    async fn create_sheet(&self, sheet: IncomeSheet) -> SheetbookResult<IncomeSheet>;

    /// Removes the sheet and its expenses
    async fn delete_sheet(&self, owner: UserId, id: SheetId) -> SheetbookResult<()>;

    async fn list_expenses(&self, owner: UserId) -> SheetbookResult<Vec<Expense>>;

    async fn create_expense(&self, owner: UserId, expense: Expense) -> SheetbookResult<Expense>;

    async fn delete_expense(&self, owner: UserId, id: ExpenseId) -> SheetbookResult<()>;

    async fn list_debts(&self, owner: UserId) -> SheetbookResult<Vec<Debt>>;

    async fn create_debt(&self, debt: Debt) -> SheetbookResult<Debt>;

    /// Returns the debt with the payment appended
    async fn record_payment(
        &self,
        owner: UserId,
        id: DebtId,
        amount: Money,
        date: NaiveDate,
    ) -> SheetbookResult<Debt>;

    async fn delete_debt(&self, owner: UserId, id: DebtId) -> SheetbookResult<()>;
}

/// [`FinanceApi`] over local JSON files
pub struct LocalApi {
    sheets: SheetRepository,
    debts: DebtRepository,
}

impl LocalApi {
    /// Open the repositories under `paths`, loading what is on disk
    pub fn open(paths: &SheetbookPaths) -> SheetbookResult<Self> {
        paths.ensure_directories()?;
        let api = Self {
            sheets: SheetRepository::new(paths.sheets_file()),
            debts: DebtRepository::new(paths.debts_file()),
        };
        api.sheets.load()?;
        api.debts.load()?;
        debug!(dir = %paths.data_dir().display(), "Local data loaded");
        Ok(api)
    }

    fn owned_sheet(&self, owner: UserId, id: SheetId) -> SheetbookResult<IncomeSheet> {
        self.sheets
            .get_sheet(id)?
            .filter(|s| s.owner == owner)
            .ok_or_else(|| SheetbookError::sheet_not_found(id.to_string()))
    }

    fn owned_debt(&self, owner: UserId, id: DebtId) -> SheetbookResult<Debt> {
        self.debts
            .get(id)?
            .filter(|d| d.owner == owner)
            .ok_or_else(|| SheetbookError::debt_not_found(id.to_string()))
    }
}

#[async_trait]
impl FinanceApi for LocalApi {
    async fn list_sheets(&self, owner: UserId) -> SheetbookResult<Vec<IncomeSheet>> {
        self.sheets.sheets_for(owner)
    }

    async fn create_sheet(&self, sheet: IncomeSheet) -> SheetbookResult<IncomeSheet> {
        sheet.validate()?;
        self.sheets.upsert_sheet(sheet.clone())?;
        self.sheets.save()?;
        info!(sheet = %sheet.id, "Income sheet created");
        Ok(sheet)
    }

    async fn delete_sheet(&self, owner: UserId, id: SheetId) -> SheetbookResult<()> {
        self.owned_sheet(owner, id)?;
        self.sheets.delete_sheet(id)?;
        self.sheets.save()?;
        info!(sheet = %id, "Income sheet deleted");
        Ok(())
    }

    async fn list_expenses(&self, owner: UserId) -> SheetbookResult<Vec<Expense>> {
        self.sheets.expenses_for(owner)
    }

    async fn create_expense(&self, owner: UserId, expense: Expense) -> SheetbookResult<Expense> {
        expense.validate()?;
        self.owned_sheet(owner, expense.sheet_id)?;
        self.sheets.upsert_expense(expense.clone())?;
        self.sheets.save()?;
        info!(expense = %expense.id, sheet = %expense.sheet_id, "Expense recorded");
        Ok(expense)
    }

    async fn delete_expense(&self, owner: UserId, id: ExpenseId) -> SheetbookResult<()> {
        let expense = self
            .sheets
            .get_expense(id)?
            .ok_or_else(|| SheetbookError::expense_not_found(id.to_string()))?;
        self.owned_sheet(owner, expense.sheet_id)
            .map_err(|_| SheetbookError::expense_not_found(id.to_string()))?;
        self.sheets.delete_expense(id)?;
        self.sheets.save()?;
        info!(expense = %id, "Expense deleted");
        Ok(())
    }

    async fn list_debts(&self, owner: UserId) -> SheetbookResult<Vec<Debt>> {
        self.debts.for_owner(owner)
    }

    async fn create_debt(&self, debt: Debt) -> SheetbookResult<Debt> {
        debt.validate()?;
        self.debts.upsert(debt.clone())?;
        self.debts.save()?;
        info!(debt = %debt.id, "Debt created");
        Ok(debt)
    }

    async fn record_payment(
        &self,
        owner: UserId,
        id: DebtId,
        amount: Money,
        date: NaiveDate,
    ) -> SheetbookResult<Debt> {
        let mut debt = self.owned_debt(owner, id)?;
        let payment = debt.record_payment(amount, date)?;
        self.debts.upsert(debt.clone())?;
        self.debts.save()?;
        info!(debt = %id, payment = %payment, amount = %amount, "Payment recorded");
        Ok(debt)
    }

    async fn delete_debt(&self, owner: UserId, id: DebtId) -> SheetbookResult<()> {
        self.owned_debt(owner, id)?;
        self.debts.delete(id)?;
        self.debts.save()?;
        info!(debt = %id, "Debt deleted");
        Ok(())
    }
}
