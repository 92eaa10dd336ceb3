//! # Router
//!
//! Maps a location fragment (`#/sheet/42`, `/debts`) to a registered async
//! handler.
//!
//! Patterns are `/`-delimited literal and `:param` segments, plus the `*`
//! wildcard used when nothing else matches. Patterns are tried in
//! registration order and the first structural match wins, so when two
//! patterns could both match a path (`/sheet/new` and `/sheet/:id`), the one
//! registered first takes it.
//!
//! Resolutions are serialized: a navigation started while another is
//! resolving waits for it to finish. Guards and handlers therefore must not
//! await [`Router::navigate`] themselves; a guard asks for a different
//! destination by returning [`GuardDecision::Redirect`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{SheetbookError, SheetbookResult};

/// Redirect hops allowed in one resolution before it is treated as a loop
pub const MAX_REDIRECTS: usize = 8;

/// Pattern of the catch-all route
pub const WILDCARD: &str = "*";

/// Async route handler
pub type RouteHandler = Arc<dyn Fn(RouteMatch) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Async navigation guard
pub type Guard = Arc<dyn Fn(NavigationRequest) -> BoxFuture<'static, GuardDecision> + Send + Sync>;

/// A resolved route: the concrete path, the pattern it matched, and captures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub path: String,
    pub pattern: String,
    pub params: HashMap<String, String>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// What a guard is asked about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub destination: String,
    pub current: Option<String>,
}

/// A guard's verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Deny,
    /// Resolve this path instead; guards run again for it
    Redirect(String),
}

impl From<bool> for GuardDecision {
    fn from(allowed: bool) -> Self {
        if allowed {
            GuardDecision::Allow
        } else {
            GuardDecision::Deny
        }
    }
}

/// Outcome of a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// A handler ran for this match (pattern `*` for the fallback)
    Resolved(RouteMatch),
    /// A guard denied the destination; the current route is unchanged
    Blocked(String),
    /// The handler gave way to a newer transition; the current route is unchanged
    Superseded(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    fn parse(raw: &str) -> SheetbookResult<Self> {
        let normalized = normalize_path(raw);
        if !raw.trim().trim_start_matches('#').starts_with('/') {
            return Err(SheetbookError::Validation(format!(
                "Route pattern must start with '/': {:?}",
                raw
            )));
        }

        let mut segments = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        for part in split_segments(&normalized) {
            match part.strip_prefix(':') {
                Some(name) => {
                    if name.is_empty() || names.contains(&name) {
                        return Err(SheetbookError::Validation(format!(
                            "Invalid parameter in route pattern {:?}",
                            raw
                        )));
                    }
                    names.push(name);
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }

        Ok(Self {
            raw: normalized,
            segments,
        })
    }

    fn matches(&self, parts: &[&str]) -> Option<HashMap<String, String>> {
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.insert(name.clone(), (*part).to_string());
                }
                _ => return None,
            }
        }
        Some(params)
    }
}

struct Route {
    pattern: RoutePattern,
    handler: RouteHandler,
}

/// Location-fragment router with ordered guards
pub struct Router {
    routes: RwLock<Vec<Route>>,
    fallback: RwLock<Option<RouteHandler>>,
    guards: RwLock<Vec<Guard>>,
    location: RwLock<String>,
    current: RwLock<Option<RouteMatch>>,
    resolving: Mutex<()>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(Vec::new()),
            fallback: RwLock::new(None),
            guards: RwLock::new(Vec::new()),
            location: RwLock::new("/".to_string()),
            current: RwLock::new(None),
            resolving: Mutex::new(()),
        }
    }

    /// Register a handler; an identical pattern is replaced in place
    pub fn register<F, Fut>(&self, pattern: &str, handler: F) -> SheetbookResult<()>
    where
        F: Fn(RouteMatch) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: RouteHandler = Arc::new(move |m| handler(m).boxed());

        if pattern.trim() == WILDCARD {
            *self.fallback.write().unwrap_or_else(PoisonError::into_inner) = Some(handler);
            debug!("Wildcard route registered");
            return Ok(());
        }

        let pattern = RoutePattern::parse(pattern)?;
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        match routes.iter_mut().find(|r| r.pattern.raw == pattern.raw) {
            Some(existing) => {
                debug!(pattern = %pattern.raw, "Route replaced");
                existing.handler = handler;
            }
            None => {
                debug!(pattern = %pattern.raw, "Route registered");
                routes.push(Route { pattern, handler });
            }
        }
        Ok(())
    }

    /// Remove a pattern (or the wildcard). Returns false if it wasn't registered.
    pub fn unregister(&self, pattern: &str) -> bool {
        if pattern.trim() == WILDCARD {
            return self
                .fallback
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .is_some();
        }

        let normalized = normalize_path(pattern);
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let before = routes.len();
        routes.retain(|r| r.pattern.raw != normalized);
        routes.len() != before
    }

    /// Registered patterns in matching order
    pub fn patterns(&self) -> Vec<String> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| r.pattern.raw.clone())
            .collect()
    }

    /// Replace every installed guard with `guard`
    pub fn set_before_each<F, Fut>(&self, guard: F)
    where
        F: Fn(NavigationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GuardDecision> + Send + 'static,
    {
        let mut guards = self.guards.write().unwrap_or_else(PoisonError::into_inner);
        guards.clear();
        guards.push(Arc::new(move |req| guard(req).boxed()));
    }

    /// Append a guard; guards run in order and the first non-`Allow` wins
    pub fn add_before_each<F, Fut>(&self, guard: F)
    where
        F: Fn(NavigationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GuardDecision> + Send + 'static,
    {
        self.guards
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(move |req| guard(req).boxed()));
    }

    pub fn clear_guards(&self) {
        self.guards
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// The externally observable location
    pub fn location(&self) -> String {
        self.location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Change the location without resolving it (an external navigation event)
    pub fn set_location(&self, path: &str) {
        *self.location.write().unwrap_or_else(PoisonError::into_inner) = normalize_path(path);
    }

    /// The last successfully resolved route
    pub fn current_route(&self) -> Option<RouteMatch> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Find the handler for `path` without running anything
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        self.lookup(&normalize_path(path)).map(|(m, _)| m)
    }

    /// Update the location and resolve it
    pub async fn navigate(&self, path: &str) -> SheetbookResult<Navigation> {
        self.set_location(path);
        self.resolve_current_path().await
    }

    /// Run the guards for the current location, then its handler
    pub async fn resolve_current_path(&self) -> SheetbookResult<Navigation> {
        let _resolving = self.resolving.lock().await;

        let mut destination = self.location();
        let mut redirects = 0;

        loop {
            let request = NavigationRequest {
                destination: destination.clone(),
                current: self.current_route().map(|m| m.path),
            };

            match self.check_guards(request).await {
                GuardDecision::Allow => break,
                GuardDecision::Deny => {
                    info!(destination = %destination, "Navigation blocked by guard");
                    self.restore_location();
                    return Ok(Navigation::Blocked(destination));
                }
                GuardDecision::Redirect(target) => {
                    redirects += 1;
                    if redirects > MAX_REDIRECTS {
                        return Err(SheetbookError::Validation(format!(
                            "Too many redirects while resolving '{}'",
                            destination
                        )));
                    }
                    debug!(from = %destination, to = %target, "Guard redirected navigation");
                    self.set_location(&target);
                    destination = self.location();
                }
            }
        }

        let Some((matched, handler)) = self.lookup(&destination) else {
            warn!(path = %destination, "Unhandled route");
            self.restore_location();
            return Err(SheetbookError::route_not_found(destination));
        };

        debug!(path = %matched.path, pattern = %matched.pattern, "Resolving route");
        if let Err(err) = handler(matched.clone()).await {
            self.restore_location();
            return match err.downcast::<SheetbookError>() {
                Ok(err) if err.is_superseded() => {
                    debug!(path = %matched.path, "Route handler was superseded");
                    Ok(Navigation::Superseded(matched.path))
                }
                Ok(err) => Err(err),
                Err(err) => Err(SheetbookError::Handler {
                    topic: matched.path.clone(),
                    message: format!("{:#}", err),
                }),
            };
        }

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(matched.clone());
        Ok(Navigation::Resolved(matched))
    }

    /// Point the location back at the current route, if there is one
    fn restore_location(&self) {
        if let Some(current) = self.current_route() {
            self.set_location(&current.path);
        }
    }

    async fn check_guards(&self, request: NavigationRequest) -> GuardDecision {
        let guards: Vec<Guard> = self
            .guards
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for guard in guards {
            match guard(request.clone()).await {
                GuardDecision::Allow => continue,
                other => return other,
            }
        }
        GuardDecision::Allow
    }

    fn lookup(&self, path: &str) -> Option<(RouteMatch, RouteHandler)> {
        let parts = split_segments(path);
        {
            let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
            for route in routes.iter() {
                if let Some(params) = route.pattern.matches(&parts) {
                    let matched = RouteMatch {
                        path: path.to_string(),
                        pattern: route.pattern.raw.clone(),
                        params,
                    };
                    return Some((matched, route.handler.clone()));
                }
            }
        }

        self.fallback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map(|handler| {
                let matched = RouteMatch {
                    path: path.to_string(),
                    pattern: WILDCARD.to_string(),
                    params: HashMap::new(),
                };
                (matched, handler)
            })
    }
}

/// Canonical form of a location: leading `/`, no `#`, no query, no trailing `/`
pub fn normalize_path(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw.strip_prefix('#').unwrap_or(raw);
    let raw = raw.split('?').next().unwrap_or_default();
    let trimmed = raw.trim_end_matches('/');
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
    format!("/{}", trimmed)
}

fn split_segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    type Log = Arc<StdMutex<Vec<String>>>;

    fn recording_router(patterns: &[&'static str]) -> (Router, Log) {
        let router = Router::new();
        let log: Log = Default::default();
        for pattern in patterns {
            let log = log.clone();
            router
                .register(pattern, move |m: RouteMatch| {
                    let log = log.clone();
                    async move {
                        let mut params: Vec<_> = m.params.iter().collect();
                        params.sort();
                        log.lock().unwrap().push(format!("{} {:?}", m.pattern, params));
                        Ok(())
                    }
                })
                .unwrap();
        }
        (router, log)
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("#/sheet/42"), "/sheet/42");
        assert_eq!(normalize_path("/debts/"), "/debts");
        assert_eq!(normalize_path("sheets?x=1"), "/sheets");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("#/"), "/");
    }

    #[test]
    fn test_invalid_patterns_rejected() {
        let router = Router::new();
        assert!(router.register("sheet/:id", |_| async { Ok(()) }).is_err());
        assert!(router.register("/sheet/:", |_| async { Ok(()) }).is_err());
        assert!(router.register("/a/:id/:id", |_| async { Ok(()) }).is_err());
    }

    #[tokio::test]
    async fn test_param_capture_and_segment_count() {
        let (router, log) = recording_router(&["/sheet/:id"]);

        let nav = router.navigate("/sheet/42").await.unwrap();
        match nav {
            Navigation::Resolved(m) => assert_eq!(m.param("id"), Some("42")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(*log.lock().unwrap(), vec![r#"/sheet/:id [("id", "42")]"#]);

        let err = router.navigate("/sheet/42/extra").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_first_registered_match_wins() {
        let (router, log) = recording_router(&["/sheet/:id", "/sheet/new"]);
        router.navigate("/sheet/new").await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec![r#"/sheet/:id [("id", "new")]"#]);

        let (router, log) = recording_router(&["/sheet/new", "/sheet/:id"]);
        router.navigate("/sheet/new").await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["/sheet/new []"]);
    }

    #[tokio::test]
    async fn test_identical_pattern_overwrites() {
        let router = Router::new();
        let log: Log = Default::default();
        for label in ["old", "new"] {
            let log = log.clone();
            router
                .register("/debts", move |_| {
                    let log = log.clone();
                    async move {
                        log.lock().unwrap().push(label.to_string());
                        Ok(())
                    }
                })
                .unwrap();
        }

        router.navigate("/debts").await.unwrap();
        assert_eq!(router.patterns(), vec!["/debts"]);
        assert_eq!(*log.lock().unwrap(), vec!["new"]);
    }

    #[tokio::test]
    async fn test_wildcard_fallback() {
        let (router, log) = recording_router(&["/sheets", "*"]);
        let nav = router.navigate("/nowhere").await.unwrap();
        match nav {
            Navigation::Resolved(m) => assert_eq!(m.pattern, WILDCARD),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(*log.lock().unwrap(), vec!["* []"]);
    }

    #[tokio::test]
    async fn test_denying_guard_keeps_current_route() {
        let (router, log) = recording_router(&["/sheets", "/debts"]);
        router.navigate("/sheets").await.unwrap();

        router.set_before_each(|req: NavigationRequest| async move {
            GuardDecision::from(req.destination != "/debts")
        });

        let nav = router.navigate("/debts").await.unwrap();
        assert_eq!(nav, Navigation::Blocked("/debts".into()));
        assert_eq!(router.current_route().unwrap().path, "/sheets");
        assert_eq!(router.location(), "/sheets");
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_guard_sees_destination_and_current() {
        let (router, _log) = recording_router(&["/a", "/b"]);
        let seen: Arc<StdMutex<Vec<NavigationRequest>>> = Default::default();
        let s = seen.clone();
        router.add_before_each(move |req| {
            s.lock().unwrap().push(req);
            async { GuardDecision::Allow }
        });

        router.navigate("/a").await.unwrap();
        router.navigate("/b").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].current, None);
        assert_eq!(seen[1].destination, "/b");
        assert_eq!(seen[1].current.as_deref(), Some("/a"));
    }

    #[tokio::test]
    async fn test_guard_chain_short_circuits() {
        let (router, log) = recording_router(&["/a"]);
        let calls = Arc::new(StdMutex::new(0));
        router.add_before_each(|_| async { GuardDecision::Deny });
        let c = calls.clone();
        router.add_before_each(move |_| {
            *c.lock().unwrap() += 1;
            async { GuardDecision::Allow }
        });

        assert!(matches!(
            router.navigate("/a").await.unwrap(),
            Navigation::Blocked(_)
        ));
        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(log.lock().unwrap().is_empty());

        // set_before_each replaces the whole chain.
        router.set_before_each(|_| async { GuardDecision::Allow });
        assert!(matches!(
            router.navigate("/a").await.unwrap(),
            Navigation::Resolved(_)
        ));
    }

    #[tokio::test]
    async fn test_redirect_and_redirect_loop() {
        let (router, log) = recording_router(&["/login", "/sheets"]);
        router.set_before_each(|req: NavigationRequest| async move {
            if req.destination == "/login" {
                GuardDecision::Allow
            } else {
                GuardDecision::Redirect("/login".into())
            }
        });

        let nav = router.navigate("/sheets").await.unwrap();
        assert!(matches!(nav, Navigation::Resolved(ref m) if m.path == "/login"));
        assert_eq!(router.location(), "/login");
        assert_eq!(*log.lock().unwrap(), vec!["/login []"]);

        router.set_before_each(|_| async { GuardDecision::Redirect("/sheets".into()) });
        let err = router.navigate("/sheets").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_handler_error_propagates_and_keeps_current() {
        let router = Router::new();
        router.register("/ok", |_| async { Ok(()) }).unwrap();
        router
            .register("/broken", |_| async {
                Err(anyhow::Error::new(SheetbookError::module_not_found("ghost")))
            })
            .unwrap();

        router.navigate("/ok").await.unwrap();
        let err = router.navigate("/broken").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(router.current_route().unwrap().path, "/ok");
        assert_eq!(router.location(), "/ok");
    }

    #[tokio::test]
    async fn test_unhandled_route_restores_location() {
        let (router, _log) = recording_router(&["/ok"]);
        router.navigate("/ok").await.unwrap();

        assert!(router.navigate("/missing").await.unwrap_err().is_not_found());
        assert_eq!(router.location(), "/ok");
    }

    #[tokio::test]
    async fn test_overlapping_navigations_run_one_at_a_time() {
        let router = Router::new();
        let log: Log = Default::default();
        for pattern in ["/a", "/b"] {
            let log = log.clone();
            router
                .register(pattern, move |m: RouteMatch| {
                    let log = log.clone();
                    async move {
                        log.lock().unwrap().push(format!("enter {}", m.path));
                        tokio::task::yield_now().await;
                        log.lock().unwrap().push(format!("leave {}", m.path));
                        Ok(())
                    }
                })
                .unwrap();
        }

        let (first, second) = tokio::join!(router.navigate("/a"), router.navigate("/b"));

        assert_eq!(first.unwrap(), Navigation::Resolved(router.match_path("/a").unwrap()));
        assert_eq!(second.unwrap(), Navigation::Resolved(router.match_path("/b").unwrap()));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enter /a", "leave /a", "enter /b", "leave /b"]
        );
        assert_eq!(router.current_route().unwrap().path, "/b");
        assert_eq!(router.location(), "/b");
    }

    #[tokio::test]
    async fn test_unregister() {
        let (router, _log) = recording_router(&["/a", "*"]);
        assert!(router.unregister("/a"));
        assert!(!router.unregister("/a"));
        assert!(router.unregister("*"));
        assert!(router.navigate("/a").await.unwrap_err().is_not_found());
    }
}
