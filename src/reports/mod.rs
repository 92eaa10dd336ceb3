//! Derived financial figures
//!
//! Pure functions over raw state: sheet balances and debt progress are
//! recomputed from the current slices every time a view needs them.

pub mod debts;
pub mod ledger;

pub use debts::{DebtOverview, DebtSummary};
pub use ledger::{LedgerOverview, SheetSummary};
