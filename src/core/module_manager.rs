//! # Module Manager
//!
//! Owns the feature modules and keeps exactly one of them active.
//!
//! Transitions (activate, deactivate, eager init, reload) are serialized by
//! one async lock, so the previous module's deactivate and teardown hooks
//! always complete before the next module's init or activate hook starts.
//! Every activation request also takes a number from a generation counter;
//! a request that finds a newer one queued behind it at a checkpoint stops
//! early and reports [`Activation::Superseded`].
//!
//! Hooks run while the transition lock is held. A hook must not await
//! `activate_module`/`deactivate_module` on the same manager.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::event_bus::EventBus;
use super::listeners::Subscription;
use super::router::{RouteMatch, Router};
use crate::error::{SheetbookError, SheetbookResult};

/// Published after a module becomes the active one
pub const MODULE_ACTIVATED: &str = "module:activated";
/// Published after a module's deactivate and teardown hooks complete
pub const MODULE_DEACTIVATED: &str = "module:deactivated";

/// A feature unit managed by [`ModuleManager`]
///
/// Only `id` and `name` are required; every hook defaults to a no-op.
#[async_trait]
pub trait Module: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Ids that must already be registered when this module registers
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Route patterns that activate this module
    fn routes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Event topics delivered to [`Module::handle_event`]
    fn events(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called with the matched route once the module is active
    async fn on_route(&self, _route: &RouteMatch) -> anyhow::Result<()> {
        Ok(())
    }

    fn handle_event(&self, _topic: &str, _payload: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs once, before the first activation
    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn activate(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn deactivate(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs after `deactivate` on every deactivation
    async fn teardown(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Text view of the module's current state
    fn render(&self) -> Option<String> {
        None
    }
}

/// Lifecycle position of a registered module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Registered, never initialized
    Registered,
    Active,
    /// Initialized but not the active module
    Inactive,
}

/// Result of [`ModuleManager::activate_module`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Activated,
    /// The module was already active; no hooks ran
    AlreadyActive,
    /// A newer activation was requested before this one finished
    Superseded,
}

struct Registered {
    module: Arc<dyn Module>,
    initialized: bool,
    subscriptions: Vec<Subscription>,
}

/// Registry and lifecycle controller for feature modules
pub struct ModuleManager {
    modules: RwLock<Vec<Registered>>,
    active: RwLock<Option<String>>,
    transition: Mutex<()>,
    generation: AtomicU64,
    router: Arc<Router>,
    bus: EventBus,
    this: Weak<ModuleManager>,
}

impl ModuleManager {
    pub fn new(router: Arc<Router>, bus: EventBus) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            modules: RwLock::new(Vec::new()),
            active: RwLock::new(None),
            transition: Mutex::new(()),
            generation: AtomicU64::new(0),
            router,
            bus,
            this: this.clone(),
        })
    }

    /// Register a module and wire its routes and event topics
    ///
    /// Dependencies must be registered first; every missing id is reported
    /// in one [`SheetbookError::Dependency`].
    pub fn register(&self, module: Arc<dyn Module>) -> SheetbookResult<()> {
        let id = module.id().to_string();
        validate_identity(&id, module.name())?;

        {
            let modules = self.modules.read().unwrap_or_else(PoisonError::into_inner);
            if modules.iter().any(|m| m.module.id() == id) {
                return Err(SheetbookError::Validation(format!(
                    "Module '{}' is already registered",
                    id
                )));
            }

            let missing: Vec<String> = module
                .dependencies()
                .into_iter()
                .filter(|dep| !modules.iter().any(|m| m.module.id() == dep))
                .collect();
            if !missing.is_empty() {
                return Err(SheetbookError::Dependency {
                    module: id,
                    missing,
                });
            }
        }

        self.wire_routes(&id, &module.routes())?;

        let subscriptions = module
            .events()
            .into_iter()
            .map(|topic| {
                let target = module.clone();
                let owned = topic.clone();
                self.bus
                    .subscribe(&topic, move |payload| target.handle_event(&owned, payload))
            })
            .collect();

        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registered {
                module,
                initialized: false,
                subscriptions,
            });
        info!(module = %id, "Module registered");
        Ok(())
    }

    /// Make `id` the active module
    ///
    /// Init and activate failures are returned as [`SheetbookError::Module`]
    /// and leave no module active. The previously active module is not
    /// restored.
    pub async fn activate_module(&self, id: &str) -> SheetbookResult<Activation> {
        let module = self.module(id)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _transition = self.transition.lock().await;

        if self.is_superseded(generation) {
            debug!(module = id, "Activation superseded before it started");
            return Ok(Activation::Superseded);
        }

        let previous = self.active_module();
        if previous.as_deref() == Some(id) {
            return Ok(Activation::AlreadyActive);
        }
        if let Some(previous) = previous {
            let previous_module = self.module(&previous)?;
            self.run_deactivation(&previous, previous_module.as_ref()).await?;
        }

        if !self.is_initialized(id) {
            self.run_init(id, module.as_ref()).await?;
        }

        if self.is_superseded(generation) {
            debug!(module = id, "Activation superseded after init");
            return Ok(Activation::Superseded);
        }

        module
            .activate()
            .await
            .map_err(|e| SheetbookError::module_failed(id, "activate", e))?;

        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(id.to_string());
        info!(module = id, "Module activated");
        self.bus.publish(MODULE_ACTIVATED, json!({ "id": id }));
        Ok(Activation::Activated)
    }

    /// Run `id`'s deactivate and teardown hooks
    ///
    /// Hooks run even when the module is not active; the active pointer is
    /// only cleared if it pointed at `id`.
    pub async fn deactivate_module(&self, id: &str) -> SheetbookResult<()> {
        let module = self.module(id)?;
        let _transition = self.transition.lock().await;
        self.run_deactivation(id, module.as_ref()).await
    }

    /// Run `id`'s init hook now if it has never run. Returns whether it ran.
    pub async fn initialize_module(&self, id: &str) -> SheetbookResult<bool> {
        let module = self.module(id)?;
        let _transition = self.transition.lock().await;
        if self.is_initialized(id) {
            return Ok(false);
        }
        self.run_init(id, module.as_ref()).await?;
        Ok(true)
    }

    /// Deactivate `id` if active and forget that it was initialized, so the
    /// next activation runs init again
    pub async fn reload_module(&self, id: &str) -> SheetbookResult<()> {
        let module = self.module(id)?;
        let _transition = self.transition.lock().await;
        if self.active_module().as_deref() == Some(id) {
            self.run_deactivation(id, module.as_ref()).await?;
        }
        self.set_initialized(id, false);
        info!(module = id, "Module reset for reload");
        Ok(())
    }

    pub fn active_module(&self) -> Option<String> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_initialized(&self, id: &str) -> bool {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|m| m.module.id() == id && m.initialized)
    }

    /// Registered ids in registration order
    pub fn module_ids(&self) -> Vec<String> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|m| m.module.id().to_string())
            .collect()
    }

    pub fn module_state(&self, id: &str) -> Option<ModuleState> {
        let initialized = self
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|m| m.module.id() == id)
            .map(|m| m.initialized)?;

        Some(if self.active_module().as_deref() == Some(id) {
            ModuleState::Active
        } else if initialized {
            ModuleState::Inactive
        } else {
            ModuleState::Registered
        })
    }

    /// Handle to a registered module
    pub fn module(&self, id: &str) -> SheetbookResult<Arc<dyn Module>> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|m| m.module.id() == id)
            .map(|m| m.module.clone())
            .ok_or_else(|| SheetbookError::module_not_found(id))
    }

    /// The active module's view, if it renders one
    pub fn render_active(&self) -> Option<String> {
        let id = self.active_module()?;
        self.module(&id).ok()?.render()
    }

    /// Drop every event subscription the registered modules hold
    pub fn detach_events(&self) {
        for registered in self
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            for subscription in &registered.subscriptions {
                subscription.unsubscribe();
            }
        }
    }

    fn wire_routes(&self, id: &str, patterns: &[String]) -> SheetbookResult<()> {
        let mut wired: Vec<&str> = Vec::new();
        for pattern in patterns {
            let manager = self.this.clone();
            let target = id.to_string();
            let registered = self.router.register(pattern, move |route: RouteMatch| {
                let manager = manager.clone();
                let target = target.clone();
                async move {
                    let Some(manager) = manager.upgrade() else {
                        return Ok(());
                    };
                    manager.enter_route(&target, &route).await?;
                    Ok::<_, anyhow::Error>(())
                }
            });

            if let Err(e) = registered {
                for pattern in wired {
                    self.router.unregister(pattern);
                }
                return Err(e);
            }
            wired.push(pattern.as_str());
        }
        Ok(())
    }

    /// Activate `id` for `route`, then hand it the match
    ///
    /// A superseded activation is reported as [`SheetbookError::Superseded`]
    /// so the router leaves its current route alone.
    async fn enter_route(&self, id: &str, route: &RouteMatch) -> SheetbookResult<Activation> {
        let module = self.module(id)?;
        let activation = self.activate_module(id).await?;
        if activation == Activation::Superseded {
            return Err(SheetbookError::Superseded(route.path.clone()));
        }
        module
            .on_route(route)
            .await
            .map_err(|e| match e.downcast::<SheetbookError>() {
                Ok(err) => err,
                Err(e) => SheetbookError::module_failed(id, "route", e),
            })?;
        Ok(activation)
    }

    async fn run_init(&self, id: &str, module: &dyn Module) -> SheetbookResult<()> {
        debug!(module = id, "Initializing module");
        module
            .init()
            .await
            .map_err(|e| SheetbookError::module_failed(id, "init", e))?;
        self.set_initialized(id, true);
        Ok(())
    }

    async fn run_deactivation(&self, id: &str, module: &dyn Module) -> SheetbookResult<()> {
        let was_active = self.active_module().as_deref() == Some(id);
        if was_active {
            *self.active.write().unwrap_or_else(PoisonError::into_inner) = None;
        }

        let outcome = match module.deactivate().await {
            Ok(()) => module.teardown().await.map_err(|e| (e, "teardown")),
            Err(e) => Err((e, "deactivate")),
        };
        if let Err((err, phase)) = outcome {
            warn!(module = id, phase = phase, error = %err, "Module failed to deactivate");
            return Err(SheetbookError::module_failed(id, phase, err));
        }

        debug!(module = id, was_active = was_active, "Module deactivated");
        self.bus.publish(MODULE_DEACTIVATED, json!({ "id": id }));
        Ok(())
    }

    fn set_initialized(&self, id: &str, initialized: bool) {
        if let Some(registered) = self
            .modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .iter_mut()
            .find(|m| m.module.id() == id)
        {
            registered.initialized = initialized;
        }
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }
}

fn validate_identity(id: &str, name: &str) -> SheetbookResult<()> {
    if id.is_empty() {
        return Err(SheetbookError::Validation("Module id is required".into()));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(SheetbookError::Validation(format!(
            "Module id '{}' may only contain letters, digits, '-' and '_'",
            id
        )));
    }
    if name.trim().is_empty() {
        return Err(SheetbookError::Validation(format!(
            "Module '{}' has no name",
            id
        )));
    }
    Ok(())
}
