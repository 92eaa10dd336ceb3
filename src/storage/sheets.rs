//! Income sheet and expense repository
//!
//! Sheets and their expenses share `data/sheets.json` so deleting a sheet
//! and its expenses is one atomic write.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::SheetbookError;
use crate::models::{Expense, ExpenseId, IncomeSheet, SheetId, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::lock_error;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SheetData {
    #[serde(default)]
    sheets: Vec<IncomeSheet>,
    #[serde(default)]
    expenses: Vec<Expense>,
}

pub struct SheetRepository {
    path: PathBuf,
    sheets: RwLock<HashMap<SheetId, IncomeSheet>>,
    expenses: RwLock<HashMap<ExpenseId, Expense>>,
}

impl SheetRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            sheets: RwLock::new(HashMap::new()),
            expenses: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), SheetbookError> {
        let file_data: SheetData = read_json(&self.path)?;

        let mut sheets = self.sheets.write().map_err(lock_error)?;
        let mut expenses = self.expenses.write().map_err(lock_error)?;
        *sheets = file_data.sheets.into_iter().map(|s| (s.id, s)).collect();
        *expenses = file_data.expenses.into_iter().map(|e| (e.id, e)).collect();
        Ok(())
    }

    pub fn save(&self) -> Result<(), SheetbookError> {
        let sheets = self.sheets.read().map_err(lock_error)?;
        let expenses = self.expenses.read().map_err(lock_error)?;

        let mut file_data = SheetData {
            sheets: sheets.values().cloned().collect(),
            expenses: expenses.values().cloned().collect(),
        };
        file_data.sheets.sort_by_key(|s| (s.date, s.created_at));
        file_data.expenses.sort_by_key(|e| (e.date, e.created_at));
        write_json_atomic(&self.path, &file_data)
    }

    pub fn get_sheet(&self, id: SheetId) -> Result<Option<IncomeSheet>, SheetbookError> {
        Ok(self.sheets.read().map_err(lock_error)?.get(&id).cloned())
    }

    /// Sheets belonging to `owner`, newest first
    pub fn sheets_for(&self, owner: UserId) -> Result<Vec<IncomeSheet>, SheetbookError> {
        let sheets = self.sheets.read().map_err(lock_error)?;
        let mut owned: Vec<IncomeSheet> = sheets.values().filter(|s| s.owner == owner).cloned().collect();
        owned.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(owned)
    }

    pub fn upsert_sheet(&self, sheet: IncomeSheet) -> Result<(), SheetbookError> {
        self.sheets.write().map_err(lock_error)?.insert(sheet.id, sheet);
        Ok(())
    }

    /// Remove a sheet and every expense recorded against it
    pub fn delete_sheet(&self, id: SheetId) -> Result<bool, SheetbookError> {
        let removed = self.sheets.write().map_err(lock_error)?.remove(&id).is_some();
        if removed {
            self.expenses
                .write()
                .map_err(lock_error)?
                .retain(|_, e| e.sheet_id != id);
        }
        Ok(removed)
    }

    pub fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>, SheetbookError> {
        Ok(self.expenses.read().map_err(lock_error)?.get(&id).cloned())
    }

    /// Expenses on sheets owned by `owner`, oldest first
    pub fn expenses_for(&self, owner: UserId) -> Result<Vec<Expense>, SheetbookError> {
        let sheets = self.sheets.read().map_err(lock_error)?;
        let expenses = self.expenses.read().map_err(lock_error)?;
        let mut owned: Vec<Expense> = expenses
            .values()
            .filter(|e| sheets.get(&e.sheet_id).map(|s| s.owner == owner).unwrap_or(false))
            .cloned()
            .collect();
        owned.sort_by_key(|e| (e.date, e.created_at));
        Ok(owned)
    }

    pub fn upsert_expense(&self, expense: Expense) -> Result<(), SheetbookError> {
        self.expenses
            .write()
            .map_err(lock_error)?
            .insert(expense.id, expense);
        Ok(())
    }

    pub fn delete_expense(&self, id: ExpenseId) -> Result<bool, SheetbookError> {
        Ok(self.expenses.write().map_err(lock_error)?.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn repo() -> (TempDir, SheetRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = SheetRepository::new(temp_dir.path().join("sheets.json"));
        repo.load().unwrap();
        (temp_dir, repo)
    }

    #[test]
    fn test_sheets_scoped_by_owner_newest_first() {
        let (_dir, repo) = repo();
        let ada = UserId::new();
        let bob = UserId::new();
        repo.upsert_sheet(IncomeSheet::new(ada, "Jan 1", Money::from_cents(100), day(1))).unwrap();
        repo.upsert_sheet(IncomeSheet::new(ada, "Jan 15", Money::from_cents(100), day(15))).unwrap();
        repo.upsert_sheet(IncomeSheet::new(bob, "Bob", Money::from_cents(100), day(2))).unwrap();

        let names: Vec<String> = repo.sheets_for(ada).unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Jan 15", "Jan 1"]);
    }

    #[test]
    fn test_delete_sheet_cascades_to_expenses() {
        let (_dir, repo) = repo();
        let owner = UserId::new();
        let keep = IncomeSheet::new(owner, "Keep", Money::from_cents(100), day(1));
        let drop = IncomeSheet::new(owner, "Drop", Money::from_cents(100), day(2));
        repo.upsert_sheet(keep.clone()).unwrap();
        repo.upsert_sheet(drop.clone()).unwrap();
        repo.upsert_expense(Expense::new(keep.id, "a", Money::from_cents(1), day(1))).unwrap();
        repo.upsert_expense(Expense::new(drop.id, "b", Money::from_cents(1), day(2))).unwrap();

        assert!(repo.delete_sheet(drop.id).unwrap());
        assert!(!repo.delete_sheet(drop.id).unwrap());

        let left = repo.expenses_for(owner).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].sheet_id, keep.id);
    }

    #[test]
    fn test_save_and_reload() {
        let (dir, repo) = repo();
        let owner = UserId::new();
        let sheet = IncomeSheet::new(owner, "Pay", Money::from_cents(5000), day(3));
        repo.upsert_sheet(sheet.clone()).unwrap();
        repo.upsert_expense(Expense::new(sheet.id, "Food", Money::from_cents(700), day(4))).unwrap();
        repo.save().unwrap();

        let reloaded = SheetRepository::new(dir.path().join("sheets.json"));
        reloaded.load().unwrap();
        assert_eq!(reloaded.get_sheet(sheet.id).unwrap(), Some(sheet));
        assert_eq!(reloaded.expenses_for(owner).unwrap().len(), 1);
    }
}
