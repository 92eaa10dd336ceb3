//! # Event Bus
//!
//! Named-topic publish/subscribe with synchronous, in-order dispatch.
//!
//! `publish` dispatches over a snapshot of the topic's listeners taken when
//! the call starts. Listeners may subscribe, unsubscribe or publish again
//! (even on the same topic) while being dispatched; a nested publish sees
//! the listener list as it exists when the nested call starts, and the
//! outer dispatch keeps iterating its own snapshot.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, trace};

use super::dispatch::{invoke_isolated, DispatchReport};
use super::listeners::{ListenerId, ListenerRegistry, Subscription};

type EventFn = dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync;

/// Listener callback. Returning an error is logged and does not stop dispatch.
pub type EventHandler = Arc<EventFn>;

/// In-process event bus. Cloning yields another handle to the same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<ListenerRegistry<EventFn>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; dispatch order follows registration order
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.listeners.allocate_id();
        self.listeners.insert(topic, id, Arc::new(handler));
        debug!(topic = topic, listener = %id, "Listener subscribed");
        self.listeners.subscription(topic, id)
    }

    /// Register a listener that fires on the next publish only
    ///
    /// The handler is wrapped: the wrapper removes its own registration and
    /// hands the payload to the inner handler exactly once.
    pub fn once<F>(&self, topic: &str, handler: F) -> Subscription
    where
        F: FnOnce(&Value) -> anyhow::Result<()> + Send + 'static,
    {
        let id = self.listeners.allocate_id();
        let slot = Mutex::new(Some(handler));
        let registry = Arc::downgrade(&self.listeners);
        let owned_topic = topic.to_string();

        let wrapper = move |payload: &Value| {
            let taken = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            let Some(handler) = taken else {
                return Ok(());
            };
            if let Some(registry) = registry.upgrade() {
                registry.remove(&owned_topic, id);
            }
            handler(payload)
        };

        self.listeners.insert(topic, id, Arc::new(wrapper));
        self.listeners.subscription(topic, id)
    }

    /// Remove a registration. Unknown ids are ignored.
    pub fn unsubscribe(&self, topic: &str, id: ListenerId) -> bool {
        self.listeners.remove(topic, id)
    }

    /// Invoke every listener of `topic` in registration order
    pub fn publish(&self, topic: &str, payload: Value) -> DispatchReport {
        let listeners = self.listeners.snapshot(topic);
        let mut report = DispatchReport::default();

        if listeners.is_empty() {
            trace!(topic = topic, "Publish without listeners");
            return report;
        }

        for handler in listeners {
            report.record(invoke_isolated(topic, || handler(&payload)));
        }

        debug!(
            topic = topic,
            invoked = report.invoked,
            failed = report.failed,
            "Event published"
        );
        report
    }

    /// Drop the listeners of one topic, or of every topic when `None`
    pub fn clear(&self, topic: Option<&str>) {
        self.listeners.clear(topic);
    }

    /// Number of listeners currently registered for a topic
    pub fn listener_count(&self, topic: &str) -> usize {
        self.listeners.count(topic)
    }
}
