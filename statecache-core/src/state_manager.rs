use crate::listeners::ListenerRegistry;
use crate::path::{insert, remove as remove_at, resolve};
use crate::{History, ListenerId, Path, StateError, Storage};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Infix between the app prefix and the path in persisted keys.
pub const STATE_KEY_INFIX: &str = "_state_";

/// Construction options for [`StateManager`].
///
/// # Examples
///
/// ```
/// use statecache_core::{MemoryStorage, StateConfig};
/// use std::sync::Arc;
///
/// let config = StateConfig::default()
///     .app_prefix("admin")
///     .storage(Arc::new(MemoryStorage::new()));
///
/// assert_eq!(config.app_prefix, "admin");
/// assert!(config.storage.is_some());
/// ```
#[derive(Clone)]
pub struct StateConfig {
    /// Namespace for persisted keys: `<app_prefix>_state_<path>`.
    pub app_prefix: String,
    /// Backend for `set_with(.., SetOptions { persist: true })` and
    /// `load_from_storage`. Persistence is a no-op without one.
    pub storage: Option<Arc<dyn Storage>>,
    /// Maximum number of history snapshots kept.
    pub history_limit: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            app_prefix: "app".to_string(),
            storage: None,
            history_limit: 100,
        }
    }
}

impl StateConfig {
    pub fn app_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.app_prefix = prefix.into();
        self
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

impl fmt::Debug for StateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateConfig")
            .field("app_prefix", &self.app_prefix)
            .field("storage", &self.storage.as_ref().map(|_| ".."))
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

/// Per-write options for [`StateManager::set_with`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Also write the value to the configured storage backend.
    pub persist: bool,
}

impl SetOptions {
    pub fn persist() -> Self {
        Self { persist: true }
    }
}

type ComputeFn = dyn Fn(&[Option<Value>]) -> Value + Send + Sync;

struct ComputedValue {
    name: Path,
    dependencies: Vec<Path>,
    compute: Box<ComputeFn>,
}

#[derive(Clone, Debug)]
struct Change {
    path: Path,
    old: Option<Value>,
    new: Option<Value>,
}

struct Inner {
    store: Value,
    history: History,
    batch_depth: usize,
    op_depth: usize,
    pending: Vec<Change>,
}

impl Inner {
    /// Folds changes into the batch buffer, keeping the first `old` seen for
    /// each path and the latest `new`.
    fn defer(&mut self, changes: &[Change]) {
        for change in changes {
            match self.pending.iter_mut().find(|p| p.path == change.path) {
                Some(pending) => pending.new = change.new.clone(),
                None => self.pending.push(change.clone()),
            }
        }
    }
}

fn diff(watched: Vec<Path>, before: Vec<Option<Value>>, store: &Value) -> Vec<Change> {
    watched
        .into_iter()
        .zip(before)
        .filter_map(|(path, old)| {
            let new = resolve(store, &path).cloned();
            (new != old).then_some(Change { path, old, new })
        })
        .collect()
}

/// A hierarchical JSON store with dotted-path addressing.
///
/// # Features
///
/// - **Paths**: `"app.config.theme"` reads and writes nested objects
/// - **Listeners**: per-path callbacks that fire only on actual changes,
///   including changes caused by writes to ancestors or descendants
/// - **Batches**: deferred, coalesced notifications
/// - **Computed values**: derived state recomputed when a dependency changes
/// - **Persistence**: optional per-path mirroring to a [`Storage`] backend
/// - **History**: linear undo/redo over whole-store snapshots
///
/// # Thread Safety
///
/// Mutating operations (writes, batches, undo/redo, clear) are serialized by
/// a `parking_lot::ReentrantMutex` held for the whole operation, including
/// computed cascades and listener dispatch. A batch on one thread therefore
/// never defers or absorbs another thread's writes; the other thread waits
/// until the batch ends. Listeners and compute functions run on the mutating
/// thread and may read or write the manager, since the lock is reentrant.
/// They must not block on another thread that writes to the same manager.
///
/// The store itself sits behind a `parking_lot::Mutex`, which is never held
/// while callbacks run, so reads from any thread proceed during a batch.
///
/// # Examples
///
/// ```
/// use statecache_core::StateManager;
/// use serde_json::json;
/// use std::sync::{Arc, Mutex};
///
/// let state = StateManager::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&seen);
/// state
///     .on("app.config.theme", move |new, _old, _path| {
///         sink.lock().unwrap().push(new.cloned());
///     })
///     .unwrap();
///
/// state.set("app", json!({"config": {"theme": "dark"}}));
/// state.set("app", json!({"config": {"theme": "dark"}, "lang": "en"}));
///
/// assert_eq!(state.get("app.config.theme"), Some(json!("dark")));
/// assert_eq!(*seen.lock().unwrap(), vec![Some(json!("dark"))]);
/// ```
pub struct StateManager {
    serial: ReentrantMutex<()>,
    inner: Mutex<Inner>,
    listeners: ListenerRegistry,
    computed: RwLock<Vec<Arc<ComputedValue>>>,
    config: StateConfig,
}

impl StateManager {
    pub fn new() -> Self {
        Self::with_config(StateConfig::default())
    }

    pub fn with_config(config: StateConfig) -> Self {
        Self {
            serial: ReentrantMutex::new(()),
            inner: Mutex::new(Inner {
                store: Value::Object(Map::new()),
                history: History::new(config.history_limit),
                batch_depth: 0,
                op_depth: 0,
                pending: Vec::new(),
            }),
            listeners: ListenerRegistry::new(),
            computed: RwLock::new(Vec::new()),
            config,
        }
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    fn parse(&self, raw: &str, operation: &str) -> Option<Path> {
        match Path::parse(raw) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(operation, error = %err, "state write ignored");
                None
            }
        }
    }

    fn storage_key(&self, path: &Path) -> String {
        format!("{}{}{}", self.config.app_prefix, STATE_KEY_INFIX, path)
    }

    /// Returns a copy of the value at `path`.
    ///
    /// `None` if any segment is missing or the path is malformed. A stored
    /// `null` comes back as `Some(Value::Null)`.
    pub fn get(&self, path: &str) -> Option<Value> {
        let path = Path::parse(path).ok()?;
        resolve(&self.inner.lock().store, &path).cloned()
    }

    pub fn set(&self, path: &str, value: impl Into<Value>) {
        self.set_with(path, value, SetOptions::default());
    }

    /// Writes `value` at `path`, creating intermediate objects.
    ///
    /// Inside an array, a segment equal to its length appends. A write that
    /// would need any other missing array index is ignored with a warning;
    /// existing arrays are never replaced.
    pub fn set_with(&self, path: &str, value: impl Into<Value>, options: SetOptions) {
        let Some(path) = self.parse(path, "set") else {
            return;
        };
        let value = value.into();
        let persisted = options.persist.then(|| value.to_string());

        if !self.write_value(&path, value) {
            return;
        }
        if let Some(text) = persisted {
            self.persist(&path, &text);
        }
    }

    fn write_value(&self, path: &Path, value: Value) -> bool {
        let written = self.write(path, |store| insert(store, path, value));
        if !written {
            warn!(path = %path, "state write ignored: array index out of range");
        }
        written
    }

    /// Deletes the value at `path` and any persisted copy of it.
    pub fn remove(&self, path: &str) -> Option<Value> {
        let path = self.parse(path, "remove")?;
        let removed = self.write(&path, |store| remove_at(store, &path));

        if let Some(storage) = &self.config.storage {
            if let Err(err) = storage.remove_item(&self.storage_key(&path)) {
                warn!(path = %path, error = %err, "failed to remove persisted state");
            }
        }
        removed
    }

    /// Empties the store without notifying listeners.
    ///
    /// History, when enabled, restarts from the empty store.
    pub fn clear(&self) {
        let _serial = self.serial.lock();
        let mut inner = self.inner.lock();
        inner.store = Value::Object(Map::new());
        inner.pending.clear();
        if inner.history.is_enabled() {
            let Inner { store, history, .. } = &mut *inner;
            history.reset(store);
        }
        debug!("state cleared");
    }

    /// Shallow-merges the keys of `partial` into the object at `path`.
    ///
    /// The target becomes an object if it is missing or holds anything else.
    /// A `partial` that is not an object is ignored.
    pub fn merge(&self, path: &str, partial: Value) {
        let Some(path) = self.parse(path, "merge") else {
            return;
        };
        let Value::Object(partial) = partial else {
            warn!(path = %path, "merge ignored: partial value is not an object");
            return;
        };

        let written = self.write(&path, |store| {
            let mut merged = match resolve(store, &path) {
                Some(Value::Object(existing)) => existing.clone(),
                _ => Map::new(),
            };
            merged.extend(partial);
            insert(store, &path, Value::Object(merged))
        });
        if !written {
            warn!(path = %path, "merge ignored: array index out of range");
        }
    }

    /// Registers `listener` on the exact path `path`.
    ///
    /// It is called with `(new, old, path)` whenever the value resolved at
    /// `path` changes, whether the write targeted `path` itself, one of its
    /// ancestors or one of its descendants.
    pub fn on<F>(&self, path: &str, listener: F) -> Result<ListenerId, StateError>
    where
        F: Fn(Option<&Value>, Option<&Value>, &str) + Send + Sync + 'static,
    {
        let path = Path::parse(path)?;
        Ok(self.listeners.register(path, listener))
    }

    pub fn off(&self, path: &str, id: ListenerId) -> bool {
        self.listeners.unregister(path, id)
    }

    /// Runs `f` with listener notifications deferred.
    ///
    /// When the outermost batch ends, each watched path whose final value
    /// differs from its value before the batch notifies once. Computed values
    /// still update immediately inside the batch. History records a single
    /// snapshot for the whole batch.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.mutation(|| {
            self.inner.lock().batch_depth += 1;
            let result = catch_unwind(AssertUnwindSafe(f));

            let flushed = {
                let mut inner = self.inner.lock();
                inner.batch_depth -= 1;
                if inner.batch_depth == 0 {
                    std::mem::take(&mut inner.pending)
                } else {
                    Vec::new()
                }
            };
            let changes: Vec<Change> = flushed.into_iter().filter(|c| c.new != c.old).collect();
            self.notify(changes);

            result.unwrap_or_else(|payload| resume_unwind(payload))
        })
    }

    /// Registers a derived value stored at `name`.
    ///
    /// `compute` receives the current values at `dependencies`, in order, and
    /// runs once immediately and again whenever one of them changes. A
    /// dependency may itself be computed. Registering a name twice replaces
    /// the earlier definition.
    pub fn computed<F>(&self, name: &str, dependencies: &[&str], compute: F)
    where
        F: Fn(&[Option<Value>]) -> Value + Send + Sync + 'static,
    {
        let Some(name) = self.parse(name, "computed") else {
            return;
        };
        let dependencies = match dependencies
            .iter()
            .map(|d| Path::parse(d))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(dependencies) => dependencies,
            Err(err) => {
                warn!(name = %name, error = %err, "computed value ignored");
                return;
            }
        };

        let entry = Arc::new(ComputedValue {
            name,
            dependencies,
            compute: Box::new(compute),
        });
        {
            let mut computed = self.computed.write();
            computed.retain(|existing| existing.name != entry.name);
            computed.push(Arc::clone(&entry));
        }
        self.mutation(|| self.evaluate(&entry));
    }

    /// Reads the persisted copy of `path` and sets it.
    ///
    /// Returns `false`, after logging, if there is no backend, no persisted
    /// value, a backend failure or unparsable JSON.
    pub fn load_from_storage(&self, path: &str) -> bool {
        match self.try_load(path) {
            Ok(()) => true,
            Err(err) => {
                warn!(path, error = %err, "failed to load persisted state");
                false
            }
        }
    }

    fn try_load(&self, raw: &str) -> Result<(), StateError> {
        let path = Path::parse(raw)?;
        let storage = self
            .config
            .storage
            .as_ref()
            .ok_or_else(|| StateError::NotPersisted(raw.to_string()))?;
        let text = storage
            .get_item(&self.storage_key(&path))?
            .ok_or_else(|| StateError::NotPersisted(raw.to_string()))?;
        let value: Value = serde_json::from_str(&text)?;

        if !self.write_value(&path, value) {
            return Err(StateError::InvalidPath(raw.to_string()));
        }
        Ok(())
    }

    /// Deep copy of the whole store.
    pub fn get_snapshot(&self) -> Value {
        self.inner.lock().store.clone()
    }

    /// Starts recording history with the current store as the baseline.
    pub fn enable_history(&self) {
        let _serial = self.serial.lock();
        let mut inner = self.inner.lock();
        let Inner { store, history, .. } = &mut *inner;
        history.enable(store);
    }

    pub fn disable_history(&self) {
        let _serial = self.serial.lock();
        self.inner.lock().history.disable();
    }

    /// Restores the previous snapshot. Returns `false` at the oldest one or
    /// when history is disabled.
    pub fn undo(&self) -> bool {
        let _serial = self.serial.lock();
        let snapshot = self.inner.lock().history.undo().cloned();
        match snapshot {
            Some(snapshot) => {
                debug!("history undo");
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Restores the next snapshot. Returns `false` at the newest one or when
    /// history is disabled.
    pub fn redo(&self) -> bool {
        let _serial = self.serial.lock();
        let snapshot = self.inner.lock().history.redo().cloned();
        match snapshot {
            Some(snapshot) => {
                debug!("history redo");
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.inner.lock().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.lock().history.can_redo()
    }

    /// All recorded snapshots, oldest first.
    pub fn get_history(&self) -> Vec<Value> {
        self.inner.lock().history.entries().to_vec()
    }

    fn persist(&self, path: &Path, text: &str) {
        match &self.config.storage {
            Some(storage) => {
                if let Err(err) = storage.set_item(&self.storage_key(path), text) {
                    warn!(path = %path, error = %err, "failed to persist state");
                }
            }
            None => warn!(path = %path, "persist requested without a storage backend"),
        }
    }

    /// Runs one public mutating operation under the serial lock. History is
    /// recorded when the outermost operation finishes, after computed values
    /// have settled.
    fn mutation<R>(&self, f: impl FnOnce() -> R) -> R {
        let _serial = self.serial.lock();
        self.inner.lock().op_depth += 1;
        let result = catch_unwind(AssertUnwindSafe(f));

        {
            let mut inner = self.inner.lock();
            inner.op_depth -= 1;
            if inner.op_depth == 0 {
                let Inner { store, history, .. } = &mut *inner;
                if history.record(store) {
                    debug!(cursor = history.cursor(), "history snapshot recorded");
                }
            }
        }

        result.unwrap_or_else(|payload| resume_unwind(payload))
    }

    /// Watched paths overlapping `target`, or all of them.
    fn watched_paths(&self, target: Option<&Path>) -> Vec<Path> {
        let mut watched: BTreeMap<String, Path> = BTreeMap::new();
        for path in self.listeners.paths() {
            watched.insert(path.as_str().to_string(), path);
        }
        for computed in self.computed.read().iter() {
            for dependency in &computed.dependencies {
                watched
                    .entry(dependency.as_str().to_string())
                    .or_insert_with(|| dependency.clone());
            }
        }
        watched
            .into_values()
            .filter(|path| target.map_or(true, |t| t.overlaps(path)))
            .collect()
    }

    fn write<R>(&self, path: &Path, op: impl FnOnce(&mut Value) -> R) -> R {
        self.mutation(|| {
            let watched = self.watched_paths(Some(path));
            let (result, changes, batching) = {
                let mut inner = self.inner.lock();
                let before: Vec<Option<Value>> = watched
                    .iter()
                    .map(|w| resolve(&inner.store, w).cloned())
                    .collect();
                let result = op(&mut inner.store);
                let changes = diff(watched, before, &inner.store);
                let batching = inner.batch_depth > 0;
                if batching {
                    inner.defer(&changes);
                }
                (result, changes, batching)
            };

            self.recompute_dependents(&changes);
            if !batching {
                self.notify(changes);
            }
            result
        })
    }

    fn restore(&self, snapshot: Value) {
        let watched = self.watched_paths(None);
        let (changes, batching) = {
            let mut inner = self.inner.lock();
            let before: Vec<Option<Value>> = watched
                .iter()
                .map(|w| resolve(&inner.store, w).cloned())
                .collect();
            inner.store = snapshot;
            let changes = diff(watched, before, &inner.store);
            let batching = inner.batch_depth > 0;
            if batching {
                inner.defer(&changes);
            }
            (changes, batching)
        };

        if !batching {
            self.notify(changes);
        }
    }

    fn recompute_dependents(&self, changes: &[Change]) {
        if changes.is_empty() {
            return;
        }
        let targets: Vec<Arc<ComputedValue>> = self
            .computed
            .read()
            .iter()
            .filter(|c| {
                changes
                    .iter()
                    .any(|change| c.dependencies.contains(&change.path))
            })
            .cloned()
            .collect();

        for target in targets {
            self.evaluate(&target);
        }
    }

    fn evaluate(&self, computed: &ComputedValue) {
        let inputs: Vec<Option<Value>> = {
            let inner = self.inner.lock();
            computed
                .dependencies
                .iter()
                .map(|d| resolve(&inner.store, d).cloned())
                .collect()
        };
        let value = (computed.compute)(&inputs);
        self.write_value(&computed.name, value);
    }

    fn notify(&self, changes: Vec<Change>) {
        for change in changes {
            self.listeners
                .notify(&change.path, change.new.as_ref(), change.old.as_ref());
        }
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Seen = Arc<Mutex<Vec<(Option<Value>, Option<Value>, String)>>>;

    fn record(state: &StateManager, path: &str) -> Seen {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        state
            .on(path, move |new, old, path| {
                sink.lock().push((new.cloned(), old.cloned(), path.to_string()));
            })
            .unwrap();
        seen
    }

    fn as_i64(value: &Option<Value>) -> i64 {
        value.as_ref().and_then(Value::as_i64).unwrap_or(0)
    }

    #[test]
    fn test_nested_paths() {
        let state = StateManager::new();
        state.set("app.config.theme", "dark");

        assert_eq!(state.get("app.config.theme"), Some(json!("dark")));
        assert_eq!(state.get("app.config"), Some(json!({"theme": "dark"})));
        assert_eq!(state.get("app.missing"), None);
        assert_eq!(state.get_snapshot(), json!({"app": {"config": {"theme": "dark"}}}));
    }

    #[test]
    fn test_null_is_not_absent() {
        let state = StateManager::new();
        state.set("user.avatar", Value::Null);
        assert_eq!(state.get("user.avatar"), Some(Value::Null));
        assert_eq!(state.get("user.name"), None);
    }

    #[test]
    fn test_get_returns_copy() {
        let state = StateManager::new();
        state.set("list", json!([1, 2]));

        let mut copy = state.get("list").unwrap();
        copy.as_array_mut().unwrap().push(json!(3));
        assert_eq!(state.get("list"), Some(json!([1, 2])));
    }

    #[test]
    fn test_nested_listener_fires_once_on_change() {
        let state = StateManager::new();
        let seen = record(&state, "app.config.theme");

        state.set("app", json!({"config": {"theme": "dark"}}));
        state.set("app", json!({"config": {"theme": "dark"}, "lang": "en"}));
        state.set("app.lang", "fr");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            (Some(json!("dark")), None, "app.config.theme".to_string())
        );
    }

    #[test]
    fn test_ancestor_listener_sees_descendant_write() {
        let state = StateManager::new();
        state.set("app.config.theme", "dark");
        let seen = record(&state, "app");

        state.set("app.config.theme", "light");
        state.set("app.config.theme", "light");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, Some(json!({"config": {"theme": "light"}})));
        assert_eq!(seen[0].1, Some(json!({"config": {"theme": "dark"}})));
    }

    #[test]
    fn test_sibling_write_does_not_notify() {
        let state = StateManager::new();
        let seen = record(&state, "a.x");
        state.set("a.y", 1);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_remove_notifies_with_absent_value() {
        let state = StateManager::new();
        state.set("session.token", "abc");
        let seen = record(&state, "session.token");

        assert_eq!(state.remove("session.token"), Some(json!("abc")));
        assert_eq!(state.remove("session.token"), None);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, None);
        assert_eq!(seen[0].1, Some(json!("abc")));
    }

    #[test]
    fn test_off_stops_notifications() {
        let state = StateManager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = state
            .on("k", move |_, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        state.set("k", 1);
        assert!(state.off("k", id));
        assert!(!state.off("k", id));
        state.set("k", 2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_batch_notifies_once_with_final_value() {
        let state = StateManager::new();
        let seen = record(&state, "count");

        let returned = state.batch(|| {
            state.set("count", 1);
            state.set("count", 2);
            state.set("count", 3);
            "done"
        });

        assert_eq!(returned, "done");
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, Some(json!(3)));
        assert_eq!(seen[0].1, None);
    }

    #[test]
    fn test_batch_without_net_change_is_silent() {
        let state = StateManager::new();
        state.set("x", 1);
        let seen = record(&state, "x");

        state.batch(|| {
            state.set("x", 2);
            state.set("x", 1);
        });
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_nested_batches_flush_at_outermost() {
        let state = StateManager::new();
        let seen = record(&state, "n");

        state.batch(|| {
            state.set("n", 1);
            state.batch(|| state.set("n", 2));
            assert!(seen.lock().is_empty());
        });
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_merge_keeps_untouched_keys() {
        let state = StateManager::new();
        state.set("user", json!({"name": "Ada", "role": "admin"}));
        let seen = record(&state, "user.role");

        state.merge("user", json!({"name": "Grace"}));
        assert_eq!(state.get("user"), Some(json!({"name": "Grace", "role": "admin"})));
        assert!(seen.lock().is_empty());

        state.merge("prefs", json!({"lang": "en"}));
        assert_eq!(state.get("prefs.lang"), Some(json!("en")));

        state.merge("user", json!(42));
        assert_eq!(state.get("user.name"), Some(json!("Grace")));
    }

    #[test]
    fn test_computed_recalculates() {
        let state = StateManager::new();
        state.set("cart.price", 100);
        state.set("cart.quantity", 2);
        state.computed("cart.total", &["cart.price", "cart.quantity"], |v| {
            json!(as_i64(&v[0]) * as_i64(&v[1]))
        });
        assert_eq!(state.get("cart.total"), Some(json!(200)));

        let seen = record(&state, "cart.total");
        state.set("cart.quantity", 3);

        assert_eq!(state.get("cart.total"), Some(json!(300)));
        assert_eq!(seen.lock()[0].0, Some(json!(300)));
    }

    #[test]
    fn test_computed_chain() {
        let state = StateManager::new();
        state.set("a", 1);
        state.computed("b", &["a"], |v| json!(as_i64(&v[0]) * 2));
        state.computed("c", &["b"], |v| json!(as_i64(&v[0]) + 1));
        assert_eq!(state.get("c"), Some(json!(3)));

        state.set("a", 5);
        assert_eq!(state.get("b"), Some(json!(10)));
        assert_eq!(state.get("c"), Some(json!(11)));
    }

    #[test]
    fn test_computed_updates_inside_batch() {
        let state = StateManager::new();
        state.set("n", 1);
        state.computed("double", &["n"], |v| json!(as_i64(&v[0]) * 2));

        state.batch(|| {
            state.set("n", 4);
            assert_eq!(state.get("double"), Some(json!(8)));
        });
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let state = StateManager::new();
        state.on("k", |_, _, _| panic!("listener failure")).unwrap();
        let seen = record(&state, "k");

        state.set("k", 1);
        assert_eq!(state.get("k"), Some(json!(1)));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_listener_can_write_back() {
        let state = Arc::new(StateManager::new());
        let inner = Arc::clone(&state);
        state
            .on("source", move |new, _, _| {
                inner.set("mirror", new.cloned().unwrap_or(Value::Null));
            })
            .unwrap();

        state.set("source", "x");
        assert_eq!(state.get("mirror"), Some(json!("x")));
    }

    #[test]
    fn test_undo_redo_counter() {
        let state = StateManager::new();
        state.enable_history();
        state.set("counter", 1);
        state.set("counter", 2);
        state.set("counter", 3);

        assert!(state.undo());
        assert_eq!(state.get("counter"), Some(json!(2)));
        assert!(state.redo());
        assert_eq!(state.get("counter"), Some(json!(3)));
        assert!(!state.redo());
    }

    #[test]
    fn test_undo_floor() {
        let state = StateManager::new();
        state.enable_history();
        state.set("counter", 1);

        assert!(state.undo());
        assert_eq!(state.get("counter"), None);
        assert!(!state.undo());
        assert!(!state.can_undo());
        assert!(state.can_redo());
    }

    #[test]
    fn test_write_after_undo_drops_redo() {
        let state = StateManager::new();
        state.enable_history();
        state.set("counter", 1);
        state.set("counter", 2);
        state.undo();
        state.set("counter", 7);

        assert!(!state.can_redo());
        assert_eq!(
            state.get_history(),
            vec![json!({}), json!({"counter": 1}), json!({"counter": 7})]
        );
    }

    #[test]
    fn test_batch_and_noop_history() {
        let state = StateManager::new();
        state.enable_history();
        state.batch(|| {
            state.set("a", 1);
            state.set("b", 2);
        });
        state.set("a", 1);

        assert_eq!(state.get_history().len(), 2);
    }

    #[test]
    fn test_computed_cascade_is_one_snapshot() {
        let state = StateManager::new();
        state.set("n", 1);
        state.computed("double", &["n"], |v| json!(as_i64(&v[0]) * 2));
        state.enable_history();

        state.set("n", 2);
        assert_eq!(state.get_history().len(), 2);

        state.undo();
        assert_eq!(state.get("double"), Some(json!(2)));
    }

    #[test]
    fn test_undo_notifies_listeners() {
        let state = StateManager::new();
        state.enable_history();
        state.set("theme", "dark");
        let seen = record(&state, "theme");

        state.undo();
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, None);
        assert_eq!(seen[0].1, Some(json!("dark")));
    }

    #[test]
    fn test_history_disabled_by_default() {
        let state = StateManager::new();
        state.set("a", 1);
        assert!(!state.undo());
        assert!(state.get_history().is_empty());
    }

    #[test]
    fn test_clear_resets_history_and_skips_listeners() {
        let state = StateManager::new();
        state.enable_history();
        state.set("a", 1);
        let seen = record(&state, "a");

        state.clear();
        assert_eq!(state.get_snapshot(), json!({}));
        assert_eq!(state.get_history(), vec![json!({})]);
        assert!(!state.can_undo());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_malformed_paths() {
        let state = StateManager::new();
        state.set("a..b", 1);
        state.set("", 1);
        state.merge(".x", json!({"k": 1}));

        assert_eq!(state.get_snapshot(), json!({}));
        assert_eq!(state.get(""), None);
        assert_eq!(state.remove("a."), None);
        assert!(matches!(
            state.on("a..b", |_, _, _| {}),
            Err(StateError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_persist_and_load() {
        let storage = Arc::new(MemoryStorage::new());
        let config = StateConfig::default()
            .app_prefix("admin")
            .storage(storage.clone());

        let state = StateManager::with_config(config.clone());
        state.set_with("user.name", "Ada", SetOptions::persist());
        assert_eq!(
            storage.get_item("admin_state_user.name").unwrap(),
            Some("\"Ada\"".to_string())
        );

        let restored = StateManager::with_config(config);
        assert!(restored.load_from_storage("user.name"));
        assert_eq!(restored.get("user.name"), Some(json!("Ada")));
        assert!(!restored.load_from_storage("user.email"));
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("app_state_broken", "{not json").unwrap();

        let state = StateManager::with_config(StateConfig::default().storage(storage));
        assert!(!state.load_from_storage("broken"));
        assert_eq!(state.get("broken"), None);
    }

    #[test]
    fn test_load_without_storage() {
        let state = StateManager::new();
        assert!(!state.load_from_storage("anything"));
    }

    #[test]
    fn test_out_of_range_write_is_not_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        let state = StateManager::with_config(StateConfig::default().storage(storage.clone()));
        state.set("list", json!([1, 2]));
        let seen = record(&state, "list");

        state.set_with("list.4", 9, SetOptions::persist());

        assert_eq!(state.get("list"), Some(json!([1, 2])));
        assert_eq!(storage.get_item("app_state_list.4").unwrap(), None);
        assert!(seen.lock().is_empty());

        storage.set_item("app_state_list.7", "1").unwrap();
        assert!(!state.load_from_storage("list.7"));
        assert_eq!(state.get("list"), Some(json!([1, 2])));
    }

    #[test]
    fn test_remove_deletes_persisted_copy() {
        let storage = Arc::new(MemoryStorage::new());
        let state = StateManager::with_config(StateConfig::default().storage(storage.clone()));

        state.set_with("token", "t", SetOptions::persist());
        state.remove("token");
        assert_eq!(storage.get_item("app_state_token").unwrap(), None);
    }
}
