//! Typed shape of the application state tree
//!
//! The state store itself holds JSON; these types describe what lives at each
//! top-level key and are used with `StateManager::get_as`/`set_as`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::debt::Debt;
use super::expense::Expense;
use super::ids::{DebtId, SheetId};
use super::income_sheet::IncomeSheet;
use super::user::UserSession;

/// State paths used by the feature modules
pub mod paths {
    pub const USER: &str = "user";
    pub const INCOME_SHEETS: &str = "incomeSheets";
    pub const EXPENSES: &str = "expenses";
    pub const DEBTS: &str = "debts";
    pub const UI: &str = "ui";
    pub const SELECTED_SHEET: &str = "ui.selectedSheet";
    pub const SELECTED_DEBT: &str = "ui.selectedDebt";
    pub const NOTICE: &str = "ui.notice";
    pub const LAST_ROUTE: &str = "ui.lastRoute";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub selected_sheet: Option<SheetId>,
    pub selected_debt: Option<DebtId>,
    /// One-line message for the next render (e.g. "Logged out")
    pub notice: Option<String>,
    pub last_route: Option<String>,
}

/// Everything the application keeps in state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateShape {
    pub user: Option<UserSession>,
    pub income_sheets: Vec<IncomeSheet>,
    pub expenses: Vec<Expense>,
    pub debts: Vec<Debt>,
    pub ui: UiState,
}

impl StateShape {
    /// The initial tree handed to the state store
    pub fn initial_tree() -> Map<String, Value> {
        match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initial_tree_keys() {
        let tree = StateShape::initial_tree();
        let keys: Vec<&str> = tree.keys().map(String::as_str).collect();
        for key in [
            paths::USER,
            paths::INCOME_SHEETS,
            paths::EXPENSES,
            paths::DEBTS,
            paths::UI,
        ] {
            assert!(keys.contains(&key), "missing {}", key);
        }
        assert_eq!(tree["user"], Value::Null);
        assert_eq!(
            tree["ui"],
            json!({"selectedSheet": null, "selectedDebt": null, "notice": null, "lastRoute": null})
        );
    }

    #[test]
    fn test_nested_paths_match_ui_fields() {
        let ui = serde_json::to_value(UiState::default()).unwrap();
        for path in [
            paths::SELECTED_SHEET,
            paths::SELECTED_DEBT,
            paths::NOTICE,
            paths::LAST_ROUTE,
        ] {
            let field = path.strip_prefix("ui.").unwrap();
            assert!(ui.get(field).is_some(), "missing {}", field);
        }
    }
}
