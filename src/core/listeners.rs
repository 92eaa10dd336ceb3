//! Keyed listener registry shared by the event bus (keyed by topic) and the
//! state store (keyed by path)

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Identifies one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Entry<H: ?Sized> {
    id: ListenerId,
    listener: Arc<H>,
}

/// Listeners grouped by key, kept in registration order
pub(crate) struct ListenerRegistry<H: ?Sized> {
    entries: RwLock<HashMap<String, Vec<Entry<H>>>>,
    next_id: AtomicU64,
}

impl<H: ?Sized> Default for ListenerRegistry<H> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<H: ?Sized + Send + Sync + 'static> ListenerRegistry<H> {
    pub(crate) fn allocate_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn insert(&self, key: &str, id: ListenerId, listener: Arc<H>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .push(Entry { id, listener });
    }

    pub(crate) fn remove(&self, key: &str, id: ListenerId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = entries.get_mut(key) else {
            return false;
        };
        let before = list.len();
        list.retain(|e| e.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            entries.remove(key);
        }
        removed
    }

    /// Listeners for `key` as they are right now, in registration order
    pub(crate) fn snapshot(&self, key: &str) -> Vec<Arc<H>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|list| list.iter().map(|e| e.listener.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, key: &str) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub(crate) fn clear(&self, key: Option<&str>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match key {
            Some(key) => {
                entries.remove(key);
            }
            None => entries.clear(),
        }
    }

    pub(crate) fn subscription(self: &Arc<Self>, key: &str, id: ListenerId) -> Subscription {
        let weak: Weak<Self> = Arc::downgrade(self);
        Subscription {
            key: key.to_string(),
            id,
            registry: weak,
        }
    }
}

trait Detach: Send + Sync {
    fn detach(&self, key: &str, id: ListenerId) -> bool;
}

impl<H: ?Sized + Send + Sync + 'static> Detach for ListenerRegistry<H> {
    fn detach(&self, key: &str, id: ListenerId) -> bool {
        self.remove(key, id)
    }
}

/// Capability to remove exactly one registration
///
/// Dropping the handle does not unsubscribe.
#[derive(Clone)]
pub struct Subscription {
    key: String,
    id: ListenerId,
    registry: Weak<dyn Detach>,
}

impl Subscription {
    /// Topic or state path this registration listens on
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the registration. Returns false if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.detach(&self.key, self.id))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}
