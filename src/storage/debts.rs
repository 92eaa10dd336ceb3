//! Debt repository for `data/debts.json`

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::SheetbookError;
use crate::models::{Debt, DebtId, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::lock_error;

#[derive(Debug, Default, Serialize, Deserialize)]
struct DebtData {
    #[serde(default)]
    debts: Vec<Debt>,
}

pub struct DebtRepository {
    path: PathBuf,
    data: RwLock<HashMap<DebtId, Debt>>,
}

impl DebtRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), SheetbookError> {
        let file_data: DebtData = read_json(&self.path)?;
        *self.data.write().map_err(lock_error)? =
            file_data.debts.into_iter().map(|d| (d.id, d)).collect();
        Ok(())
    }

    pub fn save(&self) -> Result<(), SheetbookError> {
        let data = self.data.read().map_err(lock_error)?;
        let mut debts: Vec<Debt> = data.values().cloned().collect();
        debts.sort_by_key(|d| (d.date, d.created_at));
        write_json_atomic(&self.path, &DebtData { debts })
    }

    pub fn get(&self, id: DebtId) -> Result<Option<Debt>, SheetbookError> {
        Ok(self.data.read().map_err(lock_error)?.get(&id).cloned())
    }

    /// Debts owned by `owner`: open ones first, then by date
    pub fn for_owner(&self, owner: UserId) -> Result<Vec<Debt>, SheetbookError> {
        let data = self.data.read().map_err(lock_error)?;
        let mut debts: Vec<Debt> = data.values().filter(|d| d.owner == owner).cloned().collect();
        debts.sort_by_key(|d| (d.is_settled(), d.date, d.created_at));
        Ok(debts)
    }

    pub fn upsert(&self, debt: Debt) -> Result<(), SheetbookError> {
        self.data.write().map_err(lock_error)?.insert(debt.id, debt);
        Ok(())
    }

    pub fn delete(&self, id: DebtId) -> Result<bool, SheetbookError> {
        Ok(self.data.write().map_err(lock_error)?.remove(&id).is_some())
    }
}
