//! Application assembly
//!
//! [`App`] owns one bus, one state tree, one router and one module manager,
//! and wires the three feature modules into them. Nothing here is global:
//! two `App`s in one process share nothing.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::paths::SheetbookPaths;
use crate::config::settings::Settings;
use crate::core::router::WILDCARD;
use crate::core::{
    EventBus, ModuleManager, Navigation, PersistenceConfig, RestoreOutcome, RouteMatch, Router,
    StateManager,
};
use crate::error::SheetbookResult;
use crate::features::auth::PUBLIC_ROUTES;
use crate::features::{AuthModule, DebtsModule, FeatureContext, MoneyModule};
use crate::models::state::paths;
use crate::models::StateShape;
use crate::storage::{AuthBackend, DurableStore, FileStore, FinanceApi, LocalApi, LocalAuth};

pub struct App {
    settings: Arc<Settings>,
    bus: EventBus,
    state: Arc<StateManager>,
    store: Arc<dyn DurableStore>,
    router: Arc<Router>,
    manager: Arc<ModuleManager>,
    auth: Arc<AuthModule>,
    money: Arc<MoneyModule>,
    debts: Arc<DebtsModule>,
}

impl App {
    /// Build an app over the local JSON backends under `paths`
    pub fn open(settings: Settings, paths: &SheetbookPaths) -> SheetbookResult<Self> {
        paths.ensure_directories()?;
        let api = Arc::new(LocalApi::open(paths)?);
        let auth = Arc::new(LocalAuth::open(paths)?);
        let store = Arc::new(FileStore::new(paths.state_dir()));
        Ok(Self::with_backends(settings, api, auth, store))
    }

    pub fn with_backends(
        settings: Settings,
        api: Arc<dyn FinanceApi>,
        auth: Arc<dyn AuthBackend>,
        store: Arc<dyn DurableStore>,
    ) -> Self {
        let settings = Arc::new(settings);
        let bus = EventBus::new();
        let state = Arc::new(StateManager::new(StateShape::initial_tree()));
        let router = Arc::new(Router::new());
        let manager = ModuleManager::new(router.clone(), bus.clone());

        let ctx = FeatureContext {
            state: state.clone(),
            bus: bus.clone(),
            api,
            auth,
            settings: settings.clone(),
        };

        Self {
            auth: Arc::new(AuthModule::new(ctx.clone())),
            money: Arc::new(MoneyModule::new(ctx.clone())),
            debts: Arc::new(DebtsModule::new(ctx)),
            settings,
            bus,
            state,
            store,
            router,
            manager,
        }
    }

    /// Restore persisted state and wire modules, guard and fallback route
    ///
    /// Call once per `App`.
    pub async fn start(&self) -> SheetbookResult<RestoreOutcome> {
        self.state
            .enable_persistence(self.store.clone(), self.persistence_config());
        let outcome = self.state.restore(&self.settings.state_key);
        debug!(outcome = ?outcome, "Restore finished");

        if let Err(e) = self.auth.verify_session().await {
            warn!(error = %e, "Could not verify the stored session");
        }

        self.manager.register(self.auth.clone())?;
        self.manager.register(self.money.clone())?;
        self.manager.register(self.debts.clone())?;

        self.router.set_before_each(self.auth.guard());

        let state = self.state.clone();
        self.router.register(WILDCARD, move |route: RouteMatch| {
            let state = state.clone();
            async move {
                state.set_state(paths::NOTICE, json!(format!("Unknown route: {}", route.path)))?;
                Ok::<_, anyhow::Error>(())
            }
        })?;

        info!(modules = ?self.manager.module_ids(), "Sheetbook started");
        Ok(outcome)
    }

    /// Resolve the last visited route, or the configured default
    pub async fn resume(&self) -> SheetbookResult<Navigation> {
        let last: Option<String> = self.state.get_as(paths::LAST_ROUTE).ok().flatten();
        let logged_in = self.auth.current_user().is_some();
        let target = match last {
            Some(route) if !(logged_in && PUBLIC_ROUTES.contains(&route.as_str())) => route,
            _ => self.settings.default_route.clone(),
        };
        self.navigate(&target).await
    }

    /// Resolve `path` and remember it as the last visited route
    pub async fn navigate(&self, path: &str) -> SheetbookResult<Navigation> {
        let navigation = self.router.navigate(path).await?;
        if let Navigation::Resolved(route) = &navigation {
            if route.pattern != WILDCARD {
                self.state.set_state(paths::LAST_ROUTE, json!(route.path))?;
            }
        }
        Ok(navigation)
    }

    /// The pending notice (consumed) followed by the active module's view
    pub fn render(&self) -> SheetbookResult<String> {
        let notice: Option<String> = self.state.get_as(paths::NOTICE)?;
        if notice.is_some() {
            self.state.set_state(paths::NOTICE, Value::Null)?;
        }

        let parts: Vec<String> = notice
            .into_iter()
            .chain(self.manager.render_active())
            .collect();
        Ok(parts.join("\n\n"))
    }

    /// Deactivate the active module and flush persisted state
    pub async fn shutdown(&self) -> SheetbookResult<()> {
        if let Some(active) = self.manager.active_module() {
            self.manager.deactivate_module(&active).await?;
        }
        self.manager.detach_events();
        self.state.persist(&self.settings.state_key)?;
        info!("Sheetbook shut down");
        Ok(())
    }

    fn persistence_config(&self) -> PersistenceConfig {
        PersistenceConfig {
            key: self.settings.state_key.clone(),
            fields: self.settings.persisted_fields.clone(),
            redacted: self.settings.redacted_fields.clone(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn manager(&self) -> &Arc<ModuleManager> {
        &self.manager
    }

    pub fn auth(&self) -> &AuthModule {
        &self.auth
    }

    pub fn money(&self) -> &MoneyModule {
        &self.money
    }

    pub fn debts(&self) -> &DebtsModule {
        &self.debts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> App {
        let paths = SheetbookPaths::with_base_dir(dir.path().to_path_buf());
        App::open(Settings::default(), &paths).unwrap()
    }

    fn resolved_path(navigation: Navigation) -> String {
        match navigation {
            Navigation::Resolved(route) => route.path,
            Navigation::Blocked(path) => panic!("blocked at {}", path),
            Navigation::Superseded(path) => panic!("superseded at {}", path),
        }
    }

    #[tokio::test]
    async fn test_anonymous_user_lands_on_login() {
        let dir = TempDir::new().unwrap();
        let app = open(&dir);
        app.start().await.unwrap();

        let navigation = app.navigate("/sheets").await.unwrap();

        assert_eq!(resolved_path(navigation), "/login");
        assert_eq!(app.manager().active_module().as_deref(), Some("auth"));
        assert!(app.render().unwrap().contains("Not logged in"));
    }

    #[tokio::test]
    async fn test_unknown_route_sets_notice_once() {
        let dir = TempDir::new().unwrap();
        let app = open(&dir);
        app.start().await.unwrap();
        app.auth().register("ada", "correct horse").await.unwrap();
        app.navigate("/sheets").await.unwrap();

        app.navigate("/nowhere").await.unwrap();

        let first = app.render().unwrap();
        assert!(first.starts_with("Unknown route: /nowhere"));
        assert!(!app.render().unwrap().contains("Unknown route"));
        assert_eq!(app.state().get(paths::LAST_ROUTE), Some(json!("/sheets")));
    }

    #[tokio::test]
    async fn test_session_and_route_survive_restart() {
        let dir = TempDir::new().unwrap();
        {
            let app = open(&dir);
            app.start().await.unwrap();
            app.auth().register("ada", "correct horse").await.unwrap();
            app.navigate("/debts").await.unwrap();
            app.debts()
                .add_debt(
                    "Bank",
                    Money::from_cents(5000),
                    NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
                    None,
                )
                .await
                .unwrap();
            app.shutdown().await.unwrap();
        }

        let app = open(&dir);
        let outcome = app.start().await.unwrap();
        assert!(matches!(outcome, RestoreOutcome::Restored(_)));
        assert_eq!(app.auth().current_user().unwrap().username, "ada");

        assert_eq!(resolved_path(app.resume().await.unwrap()), "/debts");
        assert!(app.render().unwrap().contains("Bank"));
    }

    #[tokio::test]
    async fn test_restored_user_without_token_is_sent_to_login() {
        let dir = TempDir::new().unwrap();
        let dirs = SheetbookPaths::with_base_dir(dir.path().to_path_buf());
        dirs.ensure_directories().unwrap();
        FileStore::new(dirs.state_dir())
            .write(&Settings::default().state_key, r#"{"user":{"username":"ada"}}"#)
            .unwrap();

        let app = open(&dir);
        app.start().await.unwrap();

        assert_eq!(resolved_path(app.navigate("/sheets").await.unwrap()), "/login");
        assert!(app.auth().current_user().is_none());
        assert_eq!(app.state().get(paths::USER), Some(Value::Null));
    }

    #[tokio::test]
    async fn test_logout_blocks_data_routes_again() {
        let dir = TempDir::new().unwrap();
        let app = open(&dir);
        app.start().await.unwrap();
        app.auth().register("ada", "correct horse").await.unwrap();
        app.navigate("/sheets").await.unwrap();

        app.auth().logout().await.unwrap();

        assert_eq!(resolved_path(app.navigate("/debts").await.unwrap()), "/login");
        assert!(app.money().sheets().is_empty());
    }

    #[tokio::test]
    async fn test_persisted_blob_has_no_data_slices() {
        let dir = TempDir::new().unwrap();
        let app = open(&dir);
        app.start().await.unwrap();
        app.auth().register("ada", "correct horse").await.unwrap();
        app.shutdown().await.unwrap();

        let blob = app.store.read(&app.settings().state_key).unwrap().unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();
        assert!(value.get("user").is_some());
        assert!(value.get("incomeSheets").is_none());
        assert!(!blob.contains("passwordHash"));
    }
}
