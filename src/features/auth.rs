//! Authentication module
//!
//! Owns the `user` slice of state and provides the navigation guard that
//! sends anonymous users to `/login`.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::future::{self, Ready};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::core::{GuardDecision, Module, NavigationRequest, RouteMatch};
use crate::error::SheetbookResult;
use crate::models::state::paths;
use crate::models::{UiState, UserSession};

use super::{invalidate_on, FeatureContext, ViewCache, Watches, AUTH_LOGIN, AUTH_LOGOUT};

pub const LOGIN_ROUTE: &str = "/login";
pub const REGISTER_ROUTE: &str = "/register";

/// Routes reachable without a session
pub const PUBLIC_ROUTES: [&str; 2] = [LOGIN_ROUTE, REGISTER_ROUTE];

pub struct AuthModule {
    ctx: FeatureContext,
    route: Mutex<String>,
    view: Arc<ViewCache>,
    watches: Watches,
}

impl AuthModule {
    pub fn new(ctx: FeatureContext) -> Self {
        Self {
            ctx,
            route: Mutex::new(LOGIN_ROUTE.to_string()),
            view: Arc::new(ViewCache::default()),
            watches: Watches::default(),
        }
    }

    pub fn current_user(&self) -> Option<UserSession> {
        self.ctx.current_user()
    }

    pub async fn register(&self, username: &str, password: &str) -> SheetbookResult<UserSession> {
        let session = self.ctx.auth.register(username, password).await?;
        self.start_session(&session)?;
        Ok(session)
    }

    pub async fn login(&self, username: &str, password: &str) -> SheetbookResult<UserSession> {
        let session = self.ctx.auth.login(username, password).await?;
        self.start_session(&session)?;
        Ok(session)
    }

    /// Revoke the session, reset every data slice and announce the logout.
    /// Returns the user that was logged in, if any.
    pub async fn logout(&self) -> SheetbookResult<Option<UserSession>> {
        let Some(session) = self.current_user() else {
            return Ok(None);
        };

        if let Err(e) = self.ctx.auth.logout(&session.token).await {
            warn!(error = %e, "Failed to revoke session; clearing it locally");
        }

        let ui = UiState {
            notice: Some("Logged out.".into()),
            ..UiState::default()
        };
        self.ctx.state.set_many(vec![
            (paths::USER, Value::Null),
            (paths::INCOME_SHEETS, json!([])),
            (paths::EXPENSES, json!([])),
            (paths::DEBTS, json!([])),
            (paths::UI, serde_json::to_value(&ui)?),
        ])?;
        self.view.invalidate();
        self.ctx.bus.publish(AUTH_LOGOUT, json!({ "username": session.username }));
        info!(user = %session.user_id, "Logged out");
        Ok(Some(session))
    }

    /// Drop a restored session the credential service no longer accepts
    pub async fn verify_session(&self) -> SheetbookResult<bool> {
        let Some(session) = self.current_user() else {
            if self.ctx.state.get(paths::USER).is_some_and(|u| !u.is_null()) {
                warn!("Stored session is malformed; clearing it");
                self.ctx.state.set_state(paths::USER, Value::Null)?;
            }
            return Ok(false);
        };
        if self.ctx.auth.verify(&session.token).await?.is_some() {
            return Ok(true);
        }

        warn!(user = %session.user_id, "Stored session is no longer valid");
        self.ctx.state.set_state(paths::USER, Value::Null)?;
        self.ctx
            .state
            .set_state(paths::NOTICE, json!("Session expired. Please log in again."))?;
        Ok(false)
    }

    /// Navigation guard: public routes pass, anything else needs a user
    pub fn guard(&self) -> impl Fn(NavigationRequest) -> Ready<GuardDecision> + Send + Sync + 'static {
        let state = self.ctx.state.clone();
        move |request: NavigationRequest| {
            let decision = if PUBLIC_ROUTES.contains(&request.destination.as_str())
                || matches!(state.get_as::<UserSession>(paths::USER), Ok(Some(_)))
            {
                GuardDecision::Allow
            } else {
                GuardDecision::Redirect(LOGIN_ROUTE.to_string())
            };
            future::ready(decision)
        }
    }

    fn start_session(&self, session: &UserSession) -> SheetbookResult<()> {
        self.ctx.state.set_as(paths::USER, session)?;
        self.view.invalidate();
        self.ctx
            .bus
            .publish(AUTH_LOGIN, json!({ "username": session.username }));
        Ok(())
    }

    fn render_view(&self) -> String {
        let route = self.route.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match (self.current_user(), route.as_str()) {
            (Some(user), _) => format!("Logged in as {}.", user.username),
            (None, REGISTER_ROUTE) => {
                "Create an account with `sheetbook register <username>`.".to_string()
            }
            (None, _) => "Not logged in. Run `sheetbook login <username>` to continue.".to_string(),
        }
    }
}

#[async_trait]
impl Module for AuthModule {
    fn id(&self) -> &str {
        "auth"
    }

    fn name(&self) -> &str {
        "Authentication"
    }

    fn routes(&self) -> Vec<String> {
        PUBLIC_ROUTES.iter().map(|r| r.to_string()).collect()
    }

    async fn init(&self) -> anyhow::Result<()> {
        self.watches
            .replace(invalidate_on(&self.ctx.state, &[paths::USER], &self.view)?);
        Ok(())
    }

    async fn on_route(&self, route: &RouteMatch) -> anyhow::Result<()> {
        *self.route.lock().unwrap_or_else(PoisonError::into_inner) = route.path.clone();
        self.view.invalidate();
        Ok(())
    }

    fn render(&self) -> Option<String> {
        Some(self.view.get_or_render(|| self.render_view()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::context;

    #[tokio::test]
    async fn test_register_sets_user_and_publishes_login() {
        let (_dir, ctx) = context();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        ctx.bus.subscribe(AUTH_LOGIN, move |payload| {
            s.lock().unwrap().push(payload.clone());
            Ok(())
        });
        let auth = AuthModule::new(ctx.clone());

        auth.register("ada", "correct horse").await.unwrap();

        assert_eq!(auth.current_user().unwrap().username, "ada");
        assert_eq!(*seen.lock().unwrap(), vec![json!({"username": "ada"})]);
    }

    #[tokio::test]
    async fn test_logout_resets_slices() {
        let (_dir, ctx) = context();
        let auth = AuthModule::new(ctx.clone());
        auth.register("ada", "correct horse").await.unwrap();
        ctx.state.set_state(paths::DEBTS, json!([{"x": 1}])).unwrap();
        let logouts = Arc::new(Mutex::new(0));
        let l = logouts.clone();
        ctx.bus.subscribe(AUTH_LOGOUT, move |_| {
            *l.lock().unwrap() += 1;
            Ok(())
        });

        let previous = auth.logout().await.unwrap();

        assert_eq!(previous.unwrap().username, "ada");
        assert!(auth.current_user().is_none());
        assert_eq!(ctx.state.get(paths::DEBTS), Some(json!([])));
        assert_eq!(ctx.state.get(paths::NOTICE), Some(json!("Logged out.")));
        assert_eq!(*logouts.lock().unwrap(), 1);

        // Logging out twice is harmless.
        assert!(auth.logout().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guard_redirects_anonymous_users() {
        let (_dir, ctx) = context();
        let auth = AuthModule::new(ctx);
        let guard = auth.guard();
        let request = |to: &str| NavigationRequest {
            destination: to.into(),
            current: None,
        };

        assert_eq!(
            guard(request("/sheets")).await,
            GuardDecision::Redirect(LOGIN_ROUTE.into())
        );
        assert_eq!(guard(request("/register")).await, GuardDecision::Allow);

        auth.register("ada", "correct horse").await.unwrap();
        assert_eq!(guard(request("/sheets")).await, GuardDecision::Allow);
    }

    #[tokio::test]
    async fn test_revoked_session_is_dropped() {
        let (_dir, ctx) = context();
        let auth = AuthModule::new(ctx.clone());
        let session = auth.register("ada", "correct horse").await.unwrap();
        assert!(auth.verify_session().await.unwrap());

        ctx.auth.logout(&session.token).await.unwrap();

        assert!(!auth.verify_session().await.unwrap());
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_malformed_user_is_not_a_session() {
        let (_dir, ctx) = context();
        ctx.state.set_state(paths::USER, json!({"username": "ada"})).unwrap();
        let auth = AuthModule::new(ctx.clone());
        let guard = auth.guard();

        let decision = guard(NavigationRequest {
            destination: "/sheets".into(),
            current: None,
        })
        .await;
        assert_eq!(decision, GuardDecision::Redirect(LOGIN_ROUTE.into()));

        assert!(!auth.verify_session().await.unwrap());
        assert_eq!(ctx.state.get(paths::USER), Some(Value::Null));
    }

    #[tokio::test]
    async fn test_render_follows_user_changes() {
        let (_dir, ctx) = context();
        let auth = AuthModule::new(ctx);
        auth.init().await.unwrap();

        assert!(auth.render().unwrap().contains("Not logged in"));
        auth.register("ada", "correct horse").await.unwrap();
        assert_eq!(auth.render().unwrap(), "Logged in as ada.");
    }
}
