//! Application core: event bus, reactive state, router and module lifecycle
//!
//! Every component is an explicitly constructed value. [`crate::app::App`]
//! builds one of each and hands them to the feature modules.

pub mod dispatch;
pub mod event_bus;
pub mod listeners;
pub mod module_manager;
pub mod router;
pub mod state;

pub use dispatch::DispatchReport;
pub use event_bus::{EventBus, EventHandler};
pub use listeners::{ListenerId, Subscription};
pub use module_manager::{Activation, Module, ModuleManager, ModuleState};
pub use router::{GuardDecision, Navigation, NavigationRequest, RouteMatch, Router};
pub use state::{PersistenceConfig, RestoreOutcome, StateChange, StateManager, StatePath};
