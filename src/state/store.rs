//! Reactive state store.
//!
//! Wraps a plain value tree so that reads hand out live [`StateView`]
//! wrappers and writes record changed paths and request a flush. One
//! store belongs to exactly one component; the scheduler installs the
//! flush-request hook via [`StateStore::set_on_change`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use super::changes::ChangeSet;
use super::path::Path;
use super::value::{MapNode, Value};
use super::view::StateView;

// =============================================================================
// STATE ERROR
// =============================================================================

/// Error returned when mutating state through a destroyed store.
///
/// Lifecycle signals arriving after teardown are silent no-ops, but a
/// user-initiated write is a bug worth surfacing, so it fails loudly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// The owning component was torn down.
    StoreDestroyed,
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::StoreDestroyed => {
                write!(f, "state store belongs to a destroyed component")
            }
        }
    }
}

impl std::error::Error for StateError {}

// =============================================================================
// STORE CORE
// =============================================================================

/// Shared store internals. Views hold a `Weak` reference so a destroyed
/// store is detectable from any outstanding wrapper.
pub(crate) struct StoreCore {
    root: MapNode,
    reactive: bool,
    inert: Cell<bool>,
    changes: RefCell<ChangeSet>,
    /// Identity-keyed wrapper cache: raw composite node -> its wrapper.
    /// Entries are dropped when the composite they wrap is replaced.
    wrappers: RefCell<HashMap<usize, StateView>>,
    /// Flush-request hook, installed by the render scheduler.
    on_change: RefCell<Option<Rc<dyn Fn()>>>,
}

impl StoreCore {
    pub(crate) fn is_inert(&self) -> bool {
        self.inert.get()
    }

    /// Record a changed path and request a flush. No-op for non-reactive
    /// stores. Callers must not hold a borrow of any state node: the
    /// flush hook may read state.
    pub(crate) fn record_change(&self, path: Path) {
        if !self.reactive || self.inert.get() {
            return;
        }
        self.changes.borrow_mut().record(path);
        let hook = self.on_change.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Cached wrapper for a composite node, creating one on first access.
    pub(crate) fn wrapper_for(
        self: &Rc<Self>,
        node: &Value,
        path: Path,
    ) -> StateView {
        let Some(id) = node.identity() else {
            // Primitives never get wrappers; callers check first.
            return StateView::new(Rc::downgrade(self), node.clone(), path);
        };
        if let Some(cached) = self.wrappers.borrow().get(&id) {
            return cached.clone();
        }
        let view = StateView::new(Rc::downgrade(self), node.clone(), path);
        self.wrappers.borrow_mut().insert(id, view.clone());
        view
    }

    /// Drop the cached wrapper for a value that is being replaced or
    /// removed.
    pub(crate) fn invalidate(&self, value: &Value) {
        if let Some(id) = value.identity() {
            self.wrappers.borrow_mut().remove(&id);
        }
    }
}

// =============================================================================
// STATE STORE
// =============================================================================

/// Per-component reactive state store.
///
/// # Example
///
/// ```
/// use spark_dom::state::{StateStore, Value};
///
/// let store = StateStore::new(Value::from(serde_json::json!({"count": 0})), true);
/// let state = store.state();
///
/// state.set("count", 1).unwrap();
/// assert_eq!(state.get("count"), Some(Value::from(1)));
/// assert!(store.has_changes());
/// ```
pub struct StateStore {
    core: Rc<StoreCore>,
}

impl StateStore {
    /// Create a store over an initial map value.
    ///
    /// Reactive stores adopt the given map node directly; non-reactive
    /// stores take a shallow copy and never record changes or request
    /// flushes. A non-map initial value yields an empty root.
    pub fn new(initial: Value, reactive: bool) -> Self {
        let root = match initial {
            Value::Map(node) if reactive => node,
            Value::Map(node) => {
                // Shallow copy: entries still share nested nodes.
                Rc::new(RefCell::new(node.borrow().clone()))
            }
            Value::Null => Rc::new(RefCell::new(IndexMap::new())),
            other => {
                tracing::warn!(kind = other.kind(), "initial state is not a map; starting empty");
                Rc::new(RefCell::new(IndexMap::new()))
            }
        };
        StateStore {
            core: Rc::new(StoreCore {
                root,
                reactive,
                inert: Cell::new(false),
                changes: RefCell::new(ChangeSet::new()),
                wrappers: RefCell::new(HashMap::new()),
                on_change: RefCell::new(None),
            }),
        }
    }

    /// The live root view.
    pub fn state(&self) -> StateView {
        let root = Value::Map(self.core.root.clone());
        self.core.wrapper_for(&root, Path::root())
    }

    /// Shallow merge into the root map. Each key goes through the normal
    /// write path, so unchanged values are skipped and changed ones are
    /// recorded individually.
    pub fn set_state(&self, partial: Value) -> Result<bool, StateError> {
        let Value::Map(entries) = partial else {
            return Ok(false);
        };
        let root = self.state();
        let mut changed = false;
        let pairs: Vec<(String, Value)> = entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in pairs {
            changed |= root.set(&key, value)?;
        }
        Ok(changed)
    }

    /// Whether reactivity is enabled for this store.
    pub fn is_reactive(&self) -> bool {
        self.core.reactive
    }

    pub fn has_changes(&self) -> bool {
        !self.core.changes.borrow().is_empty()
    }

    /// Snapshot the changed paths without draining them.
    pub fn changed_paths(&self) -> Vec<Path> {
        self.core.changes.borrow().iter().cloned().collect()
    }

    /// Drain the change set (the scheduler does this at flush time).
    pub fn take_changes(&self) -> ChangeSet {
        self.core.changes.borrow_mut().take()
    }

    pub fn clear_changed_paths(&self) {
        self.core.changes.borrow_mut().clear();
    }

    /// Install the flush-request hook. Replaces any previous hook.
    pub fn set_on_change(&self, hook: impl Fn() + 'static) {
        *self.core.on_change.borrow_mut() = Some(Rc::new(hook));
    }

    /// Tear the store down: further writes fail with
    /// [`StateError::StoreDestroyed`], the change set and wrapper cache
    /// are cleared, and the flush hook is dropped.
    pub fn mark_inert(&self) {
        self.core.inert.set(true);
        self.core.changes.borrow_mut().clear();
        self.core.wrappers.borrow_mut().clear();
        *self.core.on_change.borrow_mut() = None;
    }

    pub fn is_inert(&self) -> bool {
        self.core.inert.get()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn store_with(json: serde_json::Value) -> StateStore {
        StateStore::new(Value::from(json), true)
    }

    #[test]
    fn test_set_records_and_notifies() {
        let store = store_with(serde_json::json!({"count": 0}));
        let notified = Rc::new(Cell::new(0));
        let notified_clone = notified.clone();
        store.set_on_change(move || notified_clone.set(notified_clone.get() + 1));

        store.state().set("count", 1).unwrap();

        assert_eq!(notified.get(), 1);
        assert!(store.has_changes());
        assert_eq!(store.changed_paths(), vec![Path::key("count")]);
    }

    #[test]
    fn test_unchanged_write_is_noop() {
        let store = store_with(serde_json::json!({"count": 0}));
        assert!(!store.state().set("count", 0).unwrap());
        assert!(!store.has_changes());

        // NaN is equal to itself for skip purposes
        store.state().set("nan", f64::NAN).unwrap();
        store.clear_changed_paths();
        assert!(!store.state().set("nan", f64::NAN).unwrap());
        assert!(!store.has_changes());
    }

    #[test]
    fn test_set_state_merges_shallow() {
        let store = store_with(serde_json::json!({"a": 1, "b": 2}));
        let partial = Value::from(serde_json::json!({"b": 3, "c": 4}));
        let changed = store.set_state(partial).unwrap();
        assert!(changed);

        let state = store.state();
        assert_eq!(state.get("a"), Some(Value::from(1)));
        assert_eq!(state.get("b"), Some(Value::from(3)));
        assert_eq!(state.get("c"), Some(Value::from(4)));
    }

    #[test]
    fn test_non_reactive_never_records() {
        let store = StateStore::new(Value::from(serde_json::json!({"a": 1})), false);
        let notified = Rc::new(Cell::new(false));
        let notified_clone = notified.clone();
        store.set_on_change(move || notified_clone.set(true));

        store.state().set("a", 2).unwrap();
        store
            .set_state(Value::from(serde_json::json!({"b": 3})))
            .unwrap();

        // Writes land, but nothing is recorded and no flush is requested
        assert_eq!(store.state().get("a"), Some(Value::from(2)));
        assert_eq!(store.state().get("b"), Some(Value::from(3)));
        assert!(!store.has_changes());
        assert!(!notified.get());
    }

    #[test]
    fn test_non_reactive_copy_detaches_root() {
        let initial = Value::from(serde_json::json!({"a": 1}));
        let store = StateStore::new(initial.clone(), false);
        store.state().set("a", 2).unwrap();

        // The caller's map is untouched (shallow copy at construction)
        let Value::Map(original) = initial else { unreachable!() };
        assert_eq!(original.borrow()["a"], Value::from(1));
    }

    #[test]
    fn test_inert_store_rejects_writes() {
        let store = store_with(serde_json::json!({"a": 1}));
        let state = store.state();
        store.mark_inert();

        assert_eq!(state.set("a", 2), Err(StateError::StoreDestroyed));
        assert_eq!(
            store.set_state(Value::from(serde_json::json!({"a": 2}))),
            Err(StateError::StoreDestroyed)
        );
        assert!(!store.has_changes());
    }

    #[test]
    fn test_wrapper_identity_is_stable() {
        let store = store_with(serde_json::json!({"user": {"name": "Ada"}}));
        let first = store.state().child("user").unwrap();
        let second = store.state().child("user").unwrap();
        assert!(first.ptr_eq(&second));
    }
}
