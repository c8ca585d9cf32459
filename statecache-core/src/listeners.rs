//! Change listeners for [`StateManager`](crate::StateManager).
//!
//! Listeners are keyed by the exact path they watch. Each registration gets
//! a [`ListenerId`] used to remove it again, since closures cannot be
//! compared.

use crate::Path;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

/// Callback invoked with `(new_value, old_value, path)`.
///
/// `None` means the path resolved to nothing (before creation or after
/// removal).
pub type Listener = dyn Fn(Option<&Value>, Option<&Value>, &str) + Send + Sync;

/// Handle returned by [`StateManager::on`](crate::StateManager::on).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct PathListeners {
    path: Path,
    callbacks: Vec<(ListenerId, Arc<Listener>)>,
}

/// Registry of listeners by watched path.
///
/// Paths are kept in a `BTreeMap`, so an ancestor path is always visited
/// before its descendants.
pub struct ListenerRegistry {
    by_path: RwLock<BTreeMap<String, PathListeners>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            by_path: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register<F>(&self, path: Path, listener: F) -> ListenerId
    where
        F: Fn(Option<&Value>, Option<&Value>, &str) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.by_path
            .write()
            .entry(path.as_str().to_string())
            .or_insert_with(|| PathListeners {
                path,
                callbacks: Vec::new(),
            })
            .callbacks
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes one listener. Returns `false` if it was not registered on `path`.
    pub fn unregister(&self, path: &str, id: ListenerId) -> bool {
        let mut by_path = self.by_path.write();
        let Some(entry) = by_path.get_mut(path) else {
            return false;
        };
        let before = entry.callbacks.len();
        entry.callbacks.retain(|(existing, _)| *existing != id);
        let removed = entry.callbacks.len() != before;
        if entry.callbacks.is_empty() {
            by_path.remove(path);
        }
        removed
    }

    /// Paths with at least one listener, ancestors first.
    pub fn paths(&self) -> Vec<Path> {
        self.by_path
            .read()
            .values()
            .map(|entry| entry.path.clone())
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.by_path
            .read()
            .get(path)
            .map(|entry| entry.callbacks.len())
            .unwrap_or(0)
    }

    /// Calls every listener on `path` in registration order.
    ///
    /// Callbacks run without the registry lock held, so they may register,
    /// unregister or write state. A panicking listener is logged and the
    /// remaining listeners still run. Returns how many completed normally.
    pub fn notify(&self, path: &Path, new: Option<&Value>, old: Option<&Value>) -> usize {
        let callbacks: Vec<Arc<Listener>> = match self.by_path.read().get(path.as_str()) {
            Some(entry) => entry.callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return 0,
        };

        let mut completed = 0;
        for callback in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(new, old, path.as_str()))) {
                Ok(()) => completed += 1,
                Err(_) => error!(path = %path, "state listener panicked"),
            }
        }
        completed
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
