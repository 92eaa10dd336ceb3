//! Storage layer for Sheetbook
//!
//! JSON files under the data directory with atomic writes: the repositories
//! behind the local data API and credential service, plus the durable
//! key/blob store the state manager persists into.

pub mod api;
pub mod auth;
pub mod debts;
pub mod durable;
pub mod file_io;
pub mod sheets;
pub mod users;

pub use api::{FinanceApi, LocalApi};
pub use auth::{AuthBackend, LocalAuth};
pub use debts::DebtRepository;
pub use durable::{DurableStore, FileStore, MemoryStore};
pub use file_io::{read_json, write_json_atomic};
pub use sheets::SheetRepository;
pub use users::UserRepository;

use crate::error::SheetbookError;

pub(crate) fn lock_error<E: std::fmt::Display>(e: E) -> SheetbookError {
    SheetbookError::Storage(format!("Failed to acquire lock: {}", e))
}
