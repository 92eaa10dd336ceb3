//! Feature modules: authentication, income sheets and debts
//!
//! Each module owns a slice of state, loads it through the data API and
//! renders a text view computed from raw state on demand. Views are cached
//! until a notification on one of the module's paths (or a logout) says the
//! cache is stale.

pub mod auth;
pub mod debts;
pub mod money;

pub use auth::AuthModule;
pub use debts::DebtsModule;
pub use money::MoneyModule;

use std::sync::{Arc, Mutex, PoisonError};

use crate::config::Settings;
use crate::core::{EventBus, StateManager, Subscription};
use crate::error::{SheetbookError, SheetbookResult};
use crate::models::state::paths;
use crate::models::UserSession;
use crate::storage::{AuthBackend, FinanceApi};

/// Published after a successful login or registration
pub const AUTH_LOGIN: &str = "auth:login";
/// Published after the session is dropped and data slices are reset
pub const AUTH_LOGOUT: &str = "auth:logout";

/// Everything a feature module is built from
#[derive(Clone)]
pub struct FeatureContext {
    pub state: Arc<StateManager>,
    pub bus: EventBus,
    pub api: Arc<dyn FinanceApi>,
    pub auth: Arc<dyn AuthBackend>,
    pub settings: Arc<Settings>,
}

impl FeatureContext {
    /// The logged-in user, if any
    pub fn current_user(&self) -> Option<UserSession> {
        self.state.get_as::<UserSession>(paths::USER).ok().flatten()
    }

    pub fn require_user(&self) -> SheetbookResult<UserSession> {
        self.current_user()
            .ok_or_else(|| SheetbookError::Auth("Not logged in. Run `sheetbook login` first.".into()))
    }

    pub fn symbol(&self) -> &str {
        &self.settings.currency_symbol
    }
}

/// Last rendered view, dropped whenever its inputs change
#[derive(Debug, Default)]
pub(crate) struct ViewCache(Mutex<Option<String>>);

impl ViewCache {
    pub(crate) fn invalidate(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub(crate) fn get_or_render(&self, render: impl FnOnce() -> String) -> String {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(render).clone()
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

/// State subscriptions a module takes in `init`
///
/// Init runs again after a reload, so installing a new set drops the old one.
#[derive(Debug, Default)]
pub(crate) struct Watches(Mutex<Vec<Subscription>>);

impl Watches {
    pub(crate) fn replace(&self, subscriptions: Vec<Subscription>) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        for old in slot.drain(..) {
            old.unsubscribe();
        }
        *slot = subscriptions;
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Subscribe `view` to be dropped on any write at or below `watched`
pub(crate) fn invalidate_on(
    state: &StateManager,
    watched: &[&str],
    view: &Arc<ViewCache>,
) -> SheetbookResult<Vec<Subscription>> {
    watched
        .iter()
        .map(|path| {
            let view = view.clone();
            state.subscribe(path, move |_| {
                view.invalidate();
                Ok(())
            })
        })
        .collect()
}

/// Resolve user input to exactly one item by its short id
pub(crate) fn find_unique<'a, T>(
    items: &'a [T],
    input: &str,
    matches: impl Fn(&T, &str) -> bool,
    not_found: impl FnOnce() -> SheetbookError,
) -> SheetbookResult<&'a T> {
    let mut found = items.iter().filter(|item| matches(item, input));
    match (found.next(), found.next()) {
        (Some(item), None) => Ok(item),
        (Some(_), Some(_)) => Err(SheetbookError::Validation(format!(
            "'{}' matches more than one record; use a longer id",
            input.trim()
        ))),
        (None, _) => Err(not_found()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_cache() {
        let cache = ViewCache::default();
        assert_eq!(cache.get_or_render(|| "one".into()), "one");
        assert_eq!(cache.get_or_render(|| "two".into()), "one");
        cache.invalidate();
        assert!(!cache.is_cached());
        assert_eq!(cache.get_or_render(|| "two".into()), "two");
    }

    #[test]
    fn test_find_unique() {
        let items = vec!["apple", "apricot", "banana"];
        let starts = |item: &&str, input: &str| item.starts_with(input);
        let missing = || SheetbookError::sheet_not_found("x");

        assert_eq!(*find_unique(&items, "b", starts, missing).unwrap(), "banana");
        assert!(find_unique(&items, "ap", starts, missing).unwrap_err().is_validation());
        assert!(find_unique(&items, "z", starts, missing).unwrap_err().is_not_found());
    }

    #[test]
    fn test_watches_replace_old_subscriptions() {
        let (_dir, ctx) = test_support::context();
        let view = Arc::new(ViewCache::default());
        let watches = Watches::default();

        watches.replace(invalidate_on(&ctx.state, &[paths::USER], &view).unwrap());
        watches.replace(invalidate_on(&ctx.state, &[paths::USER], &view).unwrap());

        assert_eq!(watches.len(), 1);
        assert_eq!(ctx.state.listener_count(paths::USER), 1);

        view.get_or_render(|| "cached".into());
        ctx.state.set_state(paths::USER, serde_json::Value::Null).unwrap();
        assert!(!view.is_cached());
    }

    #[test]
    fn test_require_user_without_session() {
        let (_dir, ctx) = test_support::context();
        assert!(matches!(ctx.require_user(), Err(SheetbookError::Auth(_))));
    }
}
