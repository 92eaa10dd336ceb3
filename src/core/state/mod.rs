//! # State Manager
//!
//! The single source of truth for application state: one JSON tree
//! addressed by dot-delimited paths, with change notification and optional
//! persistence of a documented subset to a [`DurableStore`].
//!
//! ## Notification contract
//!
//! Writing at `a.b.c` notifies listeners registered on `a.b.c`, `a.b` and
//! `a`, in that order. Listeners on descendants (`a.b.c.d`) are NOT
//! notified, and mutating a value obtained from [`StateManager::get`]
//! notifies nobody: the only way to announce a change is to write it back
//! through `set_state` at (or below) the path that is being listened on.
//! Feature modules rely on this exact behaviour; keep it.

mod path;

pub use path::StatePath;

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::dispatch::{invoke_isolated, DispatchReport};
use super::listeners::{ListenerId, ListenerRegistry, Subscription};
use crate::error::{SheetbookError, SheetbookResult};
use crate::storage::DurableStore;

use path::{assign, lookup};

/// Describes one write, handed to every notified listener
///
/// `path` is the path that was written, even for listeners registered on an
/// ancestor of it.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub path: String,
    pub value: Value,
    pub previous: Value,
}

type StateFn = dyn Fn(&StateChange) -> anyhow::Result<()> + Send + Sync;

/// What gets written to durable storage, and under which key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    /// Storage key used by automatic persistence after each write
    pub key: String,
    /// Top-level fields included in the persisted blob
    pub fields: Vec<String>,
    /// Object members removed (at any depth) before anything is written
    pub redacted: Vec<String>,
}

/// Result of [`StateManager::restore`]. Restoring never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// These fields were loaded from storage
    Restored(Vec<String>),
    /// Nothing stored under the key
    Missing,
    /// Stored data could not be used; state left untouched
    Corrupt,
    /// Persistence has not been enabled
    Disabled,
}

struct Persistence {
    store: Arc<dyn DurableStore>,
    config: PersistenceConfig,
}

/// Reactive key-path state store
pub struct StateManager {
    tree: RwLock<Value>,
    initial: Map<String, Value>,
    listeners: Arc<ListenerRegistry<StateFn>>,
    persistence: RwLock<Option<Persistence>>,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new(Map::new())
    }
}

impl StateManager {
    /// Create a store whose initial (and post-`clear`) shape is `initial`
    pub fn new(initial: Map<String, Value>) -> Self {
        Self {
            tree: RwLock::new(Value::Object(initial.clone())),
            initial,
            listeners: Arc::default(),
            persistence: RwLock::new(None),
        }
    }

    /// Whole tree with no path, or the value at `path`; `None` means not found
    pub fn get_state(&self, path: Option<&str>) -> Option<Value> {
        match path {
            None => Some(self.snapshot()),
            Some(path) => self.get(path),
        }
    }

    /// Copy of the entire tree; mutating it does not touch the store
    pub fn snapshot(&self) -> Value {
        self.tree.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Copy of the value at `path`, `None` if any segment is absent
    pub fn get(&self, path: &str) -> Option<Value> {
        let path = StatePath::parse(path).ok()?;
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        lookup(&tree, path.segments()).cloned()
    }

    /// Typed read at the boundary where state meets domain types
    ///
    /// `Ok(None)` when absent (or `null`), `Validation` when the stored value
    /// does not have the expected shape.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> SheetbookResult<Option<T>> {
        match self.get(path) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                SheetbookError::Validation(format!("Unexpected shape at '{}': {}", path, e))
            }),
        }
    }

    /// Write `value` at `path` and notify the path and its ancestors
    ///
    /// Listeners are always notified, even when the value is unchanged.
    /// Persistence failures are logged, never returned.
    pub fn set_state(&self, path: &str, value: Value) -> SheetbookResult<DispatchReport> {
        let path = StatePath::parse(path)?;

        let previous = {
            let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
            let previous = lookup(&tree, path.segments())
                .cloned()
                .unwrap_or(Value::Null);
            assign(&mut tree, path.segments(), value.clone())?;
            previous
        };

        let change = StateChange {
            path: path.as_str().to_string(),
            value,
            previous,
        };
        let report = self.notify(&path, &change);

        if self.is_persisted(path.root()) {
            self.persist_quietly();
        }

        Ok(report)
    }

    /// Serialize `value` and write it at `path`
    pub fn set_as<T: Serialize>(&self, path: &str, value: &T) -> SheetbookResult<DispatchReport> {
        let value = serde_json::to_value(value).map_err(|e| {
            SheetbookError::Validation(format!("Cannot store value at '{}': {}", path, e))
        })?;
        self.set_state(path, value)
    }

    /// Apply several top-level writes as one transaction
    ///
    /// Every previous value is captured before any key is written, and
    /// listeners run only after all keys are applied, once per key whose
    /// value actually changed.
    pub fn set_many<I, K>(&self, entries: I) -> SheetbookResult<DispatchReport>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let entries: Vec<(String, Value)> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();

        for (key, _) in &entries {
            let path = StatePath::parse(key)?;
            if path.segments().len() != 1 {
                return Err(SheetbookError::Validation(format!(
                    "Bulk writes take top-level keys only, got '{}'",
                    key
                )));
            }
        }

        let report = self.apply_top_level(entries);
        self.persist_quietly();
        Ok(report)
    }

    /// Listen on `path` (and, implicitly, on writes below it)
    pub fn subscribe<F>(&self, path: &str, callback: F) -> SheetbookResult<Subscription>
    where
        F: Fn(&StateChange) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let path = StatePath::parse(path)?;
        let id = self.listeners.allocate_id();
        self.listeners.insert(path.as_str(), id, Arc::new(callback));
        debug!(path = %path, listener = %id, "State listener subscribed");
        Ok(self.listeners.subscription(path.as_str(), id))
    }

    /// Remove a registration; unknown ids are ignored
    pub fn unsubscribe(&self, path: &str, id: ListenerId) -> bool {
        match StatePath::parse(path) {
            Ok(path) => self.listeners.remove(path.as_str(), id),
            Err(_) => false,
        }
    }

    /// Number of listeners registered exactly on `path`
    pub fn listener_count(&self, path: &str) -> usize {
        StatePath::parse(path)
            .map(|p| self.listeners.count(p.as_str()))
            .unwrap_or(0)
    }

    /// Start persisting `config.fields` to `store` after every relevant write
    pub fn enable_persistence(&self, store: Arc<dyn DurableStore>, config: PersistenceConfig) {
        info!(key = %config.key, fields = ?config.fields, "State persistence enabled");
        *self
            .persistence
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Persistence { store, config });
    }

    pub fn disable_persistence(&self) {
        *self
            .persistence
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn persistence_enabled(&self) -> bool {
        self.persistence
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Write the persisted subset under `key`
    pub fn persist(&self, key: &str) -> SheetbookResult<()> {
        let guard = self.persistence.read().unwrap_or_else(PoisonError::into_inner);
        let persistence = guard
            .as_ref()
            .ok_or_else(|| SheetbookError::Storage("Persistence is not enabled".into()))?;

        let blob = {
            let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
            persisted_subset(&tree, &persistence.config)
        };
        let serialized = serde_json::to_string(&blob)?;
        persistence.store.write(key, &serialized)?;
        debug!(key = key, bytes = serialized.len(), "State persisted");
        Ok(())
    }

    /// Load the persisted subset stored under `key`
    ///
    /// Absent or unusable data leaves state untouched. Unknown fields are
    /// ignored; a field whose JSON type differs from its initial value is
    /// skipped so a stale schema cannot replace a default.
    pub fn restore(&self, key: &str) -> RestoreOutcome {
        let (read, fields) = {
            let guard = self.persistence.read().unwrap_or_else(PoisonError::into_inner);
            let Some(persistence) = guard.as_ref() else {
                return RestoreOutcome::Disabled;
            };
            (persistence.store.read(key), persistence.config.fields.clone())
        };

        let blob = match read {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!(key = key, "No persisted state");
                return RestoreOutcome::Missing;
            }
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read persisted state");
                return RestoreOutcome::Corrupt;
            }
        };

        let stored = match serde_json::from_str::<Value>(&blob) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(key = key, "Persisted state is not an object; ignoring");
                return RestoreOutcome::Corrupt;
            }
            Err(e) => {
                warn!(key = key, error = %e, "Persisted state is corrupt; ignoring");
                return RestoreOutcome::Corrupt;
            }
        };

        let entries: Vec<(String, Value)> = fields
            .iter()
            .filter_map(|field| {
                let value = stored.get(field)?;
                if self.compatible_with_initial(field, value) {
                    Some((field.clone(), value.clone()))
                } else {
                    warn!(field = %field, "Persisted field has an unexpected shape; keeping default");
                    None
                }
            })
            .collect();

        let restored: Vec<String> = entries.iter().map(|(k, _)| k.clone()).collect();
        self.apply_top_level(entries);
        info!(key = key, fields = ?restored, "State restored");
        RestoreOutcome::Restored(restored)
    }

    /// Reset to the initial shape and drop the durable copy
    ///
    /// Every top-level key is notified as transitioning to its default.
    pub fn clear(&self) -> DispatchReport {
        let previous = {
            let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *tree, Value::Object(self.initial.clone()))
        };

        if let Some(persistence) = self
            .persistence
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            if let Err(e) = persistence.store.remove(&persistence.config.key) {
                warn!(error = %e, "Failed to remove persisted state");
            }
        }

        let mut keys: BTreeSet<String> = self.initial.keys().cloned().collect();
        if let Value::Object(map) = &previous {
            keys.extend(map.keys().cloned());
        }

        let mut report = DispatchReport::default();
        for key in keys {
            let change = StateChange {
                value: self.initial.get(&key).cloned().unwrap_or(Value::Null),
                previous: previous.get(&key).cloned().unwrap_or(Value::Null),
                path: key,
            };
            if let Ok(path) = StatePath::parse(&change.path) {
                report.merge(self.notify(&path, &change));
            }
        }
        info!("State cleared");
        report
    }

    fn apply_top_level(&self, entries: Vec<(String, Value)>) -> DispatchReport {
        let changes: Vec<StateChange> = {
            let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
            let previous: Vec<Value> = entries
                .iter()
                .map(|(key, _)| tree.get(key).cloned().unwrap_or(Value::Null))
                .collect();

            if !tree.is_object() {
                *tree = Value::Object(Map::new());
            }
            if let Value::Object(map) = &mut *tree {
                for (key, value) in &entries {
                    map.insert(key.clone(), value.clone());
                }
            }

            entries
                .into_iter()
                .zip(previous)
                .filter(|((_, value), previous)| value != previous)
                .map(|((path, value), previous)| StateChange {
                    path,
                    value,
                    previous,
                })
                .collect()
        };

        let mut report = DispatchReport::default();
        for change in &changes {
            if let Ok(path) = StatePath::parse(&change.path) {
                report.merge(self.notify(&path, change));
            }
        }
        report
    }

    fn notify(&self, path: &StatePath, change: &StateChange) -> DispatchReport {
        let mut report = DispatchReport::default();
        for key in path.self_and_ancestors() {
            for listener in self.listeners.snapshot(&key) {
                report.record(invoke_isolated(&key, || listener(change)));
            }
        }
        report
    }

    fn is_persisted(&self, root: &str) -> bool {
        self.persistence
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|p| p.config.fields.iter().any(|f| f == root))
            .unwrap_or(false)
    }

    fn persist_quietly(&self) {
        let key = match self
            .persistence
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(p) => p.config.key.clone(),
            None => return,
        };
        if let Err(e) = self.persist(&key) {
            warn!(key = %key, error = %e, "Failed to persist state");
        }
    }

    fn compatible_with_initial(&self, field: &str, stored: &Value) -> bool {
        match self.initial.get(field) {
            None | Some(Value::Null) => true,
            Some(Value::Object(_)) => stored.is_object(),
            Some(Value::Array(_)) => stored.is_array(),
            Some(Value::String(_)) => stored.is_string(),
            Some(Value::Number(_)) => stored.is_number(),
            Some(Value::Bool(_)) => stored.is_boolean(),
        }
    }
}

fn persisted_subset(tree: &Value, config: &PersistenceConfig) -> Value {
    let mut subset = Map::new();
    for field in &config.fields {
        if let Some(value) = tree.get(field) {
            let mut value = value.clone();
            redact(&mut value, &config.redacted);
            subset.insert(field.clone(), value);
        }
    }
    Value::Object(subset)
}

fn redact(value: &mut Value, names: &[String]) {
    match value {
        Value::Object(map) => {
            map.retain(|k, _| !names.iter().any(|n| n == k));
            map.values_mut().for_each(|v| redact(v, names));
        }
        Value::Array(items) => items.iter_mut().for_each(|v| redact(v, names)),
        _ => {}
    }
}
