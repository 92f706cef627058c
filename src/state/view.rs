//! Live state views - the transparent wrappers handed out by the store.
//!
//! A view pairs a raw composite node with its path from the root. Reads
//! of composite children return cached child views (same wrapper for the
//! same underlying node, see `StoreCore::wrapper_for`); writes and
//! in-place list mutations go through to the raw node, record the changed
//! path, and request a flush.
//!
//! Kind mismatches are lenient: list operations on a map view (and vice
//! versa) are no-ops returning a neutral value, the way a dynamic host
//! object would shrug them off.

use std::cmp::Ordering;
use std::rc::{Rc, Weak};

use super::path::Path;
use super::store::{StateError, StoreCore};
use super::value::Value;

/// Map keys with this prefix bypass interception: they are written
/// without change recording. Reserved for host-internal bookkeeping.
const INTERNAL_PREFIX: &str = "__";

// =============================================================================
// STATE VIEW
// =============================================================================

/// Transparent wrapper over one composite node of a component's state.
#[derive(Clone)]
pub struct StateView {
    core: Weak<StoreCore>,
    node: Value,
    path: Path,
}

impl StateView {
    pub(crate) fn new(core: Weak<StoreCore>, node: Value, path: Path) -> Self {
        StateView { core, node, path }
    }

    /// Wrapper identity: two views are the same wrapper when they wrap
    /// the same underlying node.
    pub fn ptr_eq(&self, other: &StateView) -> bool {
        match (self.node.identity(), other.node.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_list(&self) -> bool {
        self.node.is_list()
    }

    pub fn is_map(&self) -> bool {
        self.node.is_map()
    }

    /// The wrapped raw node.
    pub fn value(&self) -> Value {
        self.node.clone()
    }

    /// Deep copy of the wrapped subtree.
    pub fn snapshot(&self) -> Value {
        self.node.snapshot()
    }

    pub fn len(&self) -> usize {
        if self.dead() {
            return 0;
        }
        match &self.node {
            Value::List(list) => list.borrow().len(),
            Value::Map(map) => map.borrow().len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn core(&self) -> Result<Rc<StoreCore>, StateError> {
        match self.core.upgrade() {
            Some(core) if !core.is_inert() => Ok(core),
            _ => Err(StateError::StoreDestroyed),
        }
    }

    fn dead(&self) -> bool {
        self.core().is_err()
    }

    // =========================================================================
    // MAP ACCESS
    // =========================================================================

    /// Read a property. Composite values are returned as raw nodes; use
    /// [`StateView::child`] to get a tracked wrapper instead.
    pub fn get(&self, key: &str) -> Option<Value> {
        if self.dead() {
            return None;
        }
        match &self.node {
            Value::Map(map) => map.borrow().get(key).cloned(),
            _ => None,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        match &self.node {
            Value::Map(map) => !self.dead() && map.borrow().contains_key(key),
            _ => false,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        if self.dead() {
            return Vec::new();
        }
        match &self.node {
            Value::Map(map) => map.borrow().keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Tracked wrapper for a composite-valued property. `None` when the
    /// key is missing or holds a primitive.
    pub fn child(&self, key: &str) -> Option<StateView> {
        let core = self.core().ok()?;
        let Value::Map(map) = &self.node else {
            return None;
        };
        let value = map.borrow().get(key).cloned()?;
        if !value.is_composite() {
            return None;
        }
        Some(core.wrapper_for(&value, self.path.child(key)))
    }

    /// Write a property. Returns `Ok(true)` when the stored value
    /// actually changed; writes of a strictly-equal value (NaN included)
    /// are skipped entirely.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<bool, StateError> {
        let core = self.core()?;
        let value = value.into();
        let Value::Map(map) = &self.node else {
            return Ok(false);
        };
        {
            let mut map = map.borrow_mut();
            if let Some(old) = map.get(key) {
                if old.same(&value) {
                    return Ok(false);
                }
                core.invalidate(old);
            }
            map.insert(key.to_string(), value);
        }
        if !key.starts_with(INTERNAL_PREFIX) {
            core.record_change(self.path.child(key));
        }
        Ok(true)
    }

    /// Delete a property. `Ok(false)` without recording when the key was
    /// not present.
    pub fn remove(&self, key: &str) -> Result<bool, StateError> {
        let core = self.core()?;
        let Value::Map(map) = &self.node else {
            return Ok(false);
        };
        let removed = map.borrow_mut().shift_remove(key);
        match removed {
            Some(old) => {
                core.invalidate(&old);
                if !key.starts_with(INTERNAL_PREFIX) {
                    core.record_change(self.path.child(key));
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // LIST ACCESS
    // =========================================================================

    pub fn get_index(&self, index: usize) -> Option<Value> {
        if self.dead() {
            return None;
        }
        match &self.node {
            Value::List(list) => list.borrow().get(index).cloned(),
            _ => None,
        }
    }

    /// Tracked wrapper for a composite list element.
    pub fn item(&self, index: usize) -> Option<StateView> {
        let core = self.core().ok()?;
        let Value::List(list) = &self.node else {
            return None;
        };
        let value = list.borrow().get(index).cloned()?;
        if !value.is_composite() {
            return None;
        }
        Some(core.wrapper_for(&value, self.path.index(index)))
    }

    /// Direct index write. Records the index path (this is the one list
    /// mutation that is index-specific). Out-of-range indices pad with
    /// nulls first.
    pub fn set_index(&self, index: usize, value: impl Into<Value>) -> Result<bool, StateError> {
        let core = self.core()?;
        let value = value.into();
        let Value::List(list) = &self.node else {
            return Ok(false);
        };
        {
            let mut list = list.borrow_mut();
            if let Some(old) = list.get(index) {
                if old.same(&value) {
                    return Ok(false);
                }
                core.invalidate(old);
                list[index] = value;
            } else {
                list.resize(index, Value::Null);
                list.push(value);
            }
        }
        core.record_change(self.path.index(index));
        Ok(true)
    }

    /// Append. Returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize, StateError> {
        let core = self.core()?;
        let Value::List(list) = &self.node else {
            return Ok(0);
        };
        let len = {
            let mut list = list.borrow_mut();
            list.push(value.into());
            list.len()
        };
        core.record_change(self.path.clone());
        Ok(len)
    }

    /// Remove from the end.
    pub fn pop(&self) -> Result<Option<Value>, StateError> {
        let core = self.core()?;
        let Value::List(list) = &self.node else {
            return Ok(None);
        };
        let removed = list.borrow_mut().pop();
        if let Some(removed) = &removed {
            core.invalidate(removed);
            core.record_change(self.path.clone());
        }
        Ok(removed)
    }

    /// Remove from the front.
    pub fn shift(&self) -> Result<Option<Value>, StateError> {
        let core = self.core()?;
        let Value::List(list) = &self.node else {
            return Ok(None);
        };
        let removed = {
            let mut list = list.borrow_mut();
            if list.is_empty() { None } else { Some(list.remove(0)) }
        };
        if let Some(removed) = &removed {
            core.invalidate(removed);
            core.record_change(self.path.clone());
        }
        Ok(removed)
    }

    /// Insert at the front. Returns the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> Result<usize, StateError> {
        let core = self.core()?;
        let Value::List(list) = &self.node else {
            return Ok(0);
        };
        let len = {
            let mut list = list.borrow_mut();
            list.insert(0, value.into());
            list.len()
        };
        core.record_change(self.path.clone());
        Ok(len)
    }

    /// Insert at an index (clamped to the current length).
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<(), StateError> {
        let core = self.core()?;
        let Value::List(list) = &self.node else {
            return Ok(());
        };
        {
            let mut list = list.borrow_mut();
            let index = index.min(list.len());
            list.insert(index, value.into());
        }
        core.record_change(self.path.clone());
        Ok(())
    }

    /// Remove at an index. `Ok(None)` without recording when out of range.
    pub fn remove_at(&self, index: usize) -> Result<Option<Value>, StateError> {
        let core = self.core()?;
        let Value::List(list) = &self.node else {
            return Ok(None);
        };
        let removed = {
            let mut list = list.borrow_mut();
            if index < list.len() { Some(list.remove(index)) } else { None }
        };
        if let Some(removed) = &removed {
            core.invalidate(removed);
            core.record_change(self.path.clone());
        }
        Ok(removed)
    }

    /// Sort by rendered string form (the host language's default sort).
    pub fn sort(&self) -> Result<(), StateError> {
        self.sort_by(|a, b| a.to_string().cmp(&b.to_string()))
    }

    /// Sort with a comparator.
    pub fn sort_by(
        &self,
        mut compare: impl FnMut(&Value, &Value) -> Ordering,
    ) -> Result<(), StateError> {
        let core = self.core()?;
        let Value::List(list) = &self.node else {
            return Ok(());
        };
        list.borrow_mut().sort_by(&mut compare);
        core.record_change(self.path.clone());
        Ok(())
    }

    pub fn reverse(&self) -> Result<(), StateError> {
        let core = self.core()?;
        let Value::List(list) = &self.node else {
            return Ok(());
        };
        list.borrow_mut().reverse();
        core.record_change(self.path.clone());
        Ok(())
    }

    /// Replace every element with a clone of `value`.
    pub fn fill(&self, value: impl Into<Value>) -> Result<(), StateError> {
        let core = self.core()?;
        let value = value.into();
        let Value::List(list) = &self.node else {
            return Ok(());
        };
        {
            let mut list = list.borrow_mut();
            for slot in list.iter_mut() {
                core.invalidate(slot);
                *slot = value.clone();
            }
        }
        core.record_change(self.path.clone());
        Ok(())
    }

    /// Rotate left by `n` (modulo length).
    pub fn rotate_left(&self, n: usize) -> Result<(), StateError> {
        let core = self.core()?;
        let Value::List(list) = &self.node else {
            return Ok(());
        };
        {
            let mut list = list.borrow_mut();
            let len = list.len();
            if len > 0 {
                list.rotate_left(n % len);
            }
        }
        core.record_change(self.path.clone());
        Ok(())
    }

    /// Rotate right by `n` (modulo length).
    pub fn rotate_right(&self, n: usize) -> Result<(), StateError> {
        let core = self.core()?;
        let Value::List(list) = &self.node else {
            return Ok(());
        };
        {
            let mut list = list.borrow_mut();
            let len = list.len();
            if len > 0 {
                list.rotate_right(n % len);
            }
        }
        core.record_change(self.path.clone());
        Ok(())
    }
}

impl std::fmt::Debug for StateView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StateView({} => {:?})", self.path, self.node)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::super::store::StateStore;
    use super::*;

    fn store_with(json: serde_json::Value) -> StateStore {
        StateStore::new(Value::from(json), true)
    }

    #[test]
    fn test_nested_write_records_path_and_parent() {
        let store = store_with(serde_json::json!({"a": {"b": {"c": 1}}}));
        let inner = store.state().child("a").unwrap().child("b").unwrap();
        inner.set("c", 2).unwrap();

        let paths = store.changed_paths();
        assert!(paths.contains(&Path::key("a").child("b").child("c")));
        assert!(paths.contains(&Path::key("a").child("b")));
        assert!(!paths.contains(&Path::key("a")));
    }

    #[test]
    fn test_list_mutators_record_list_path() {
        let store = store_with(serde_json::json!({"todos": ["a"]}));
        let todos = store.state().child("todos").unwrap();

        assert_eq!(todos.push("b").unwrap(), 2);
        let paths = store.changed_paths();
        assert!(paths.contains(&Path::key("todos")));
        assert!(!paths.contains(&Path::key("todos").index(1)));
    }

    #[test]
    fn test_list_mutator_return_values() {
        let store = store_with(serde_json::json!({"xs": [1, 2, 3]}));
        let xs = store.state().child("xs").unwrap();

        assert_eq!(xs.pop().unwrap(), Some(Value::from(3)));
        assert_eq!(xs.shift().unwrap(), Some(Value::from(1)));
        assert_eq!(xs.unshift(0).unwrap(), 2);
        assert_eq!(xs.get_index(0), Some(Value::from(0)));
        xs.insert(1, 9).unwrap();
        assert_eq!(xs.get_index(1), Some(Value::from(9)));
        assert_eq!(xs.remove_at(1).unwrap(), Some(Value::from(9)));
        assert_eq!(xs.remove_at(10).unwrap(), None);
    }

    #[test]
    fn test_sort_reverse_rotate_fill() {
        let store = store_with(serde_json::json!({"xs": ["c", "a", "b"]}));
        let xs = store.state().child("xs").unwrap();

        xs.sort().unwrap();
        assert_eq!(xs.value(), Value::from(serde_json::json!(["a", "b", "c"])));
        xs.reverse().unwrap();
        assert_eq!(xs.value(), Value::from(serde_json::json!(["c", "b", "a"])));
        xs.rotate_left(1).unwrap();
        assert_eq!(xs.value(), Value::from(serde_json::json!(["b", "a", "c"])));
        xs.rotate_right(1).unwrap();
        assert_eq!(xs.value(), Value::from(serde_json::json!(["c", "b", "a"])));
        xs.fill("x").unwrap();
        assert_eq!(xs.value(), Value::from(serde_json::json!(["x", "x", "x"])));
    }

    #[test]
    fn test_set_index_records_index_path() {
        let store = store_with(serde_json::json!({"xs": [1, 2]}));
        let xs = store.state().child("xs").unwrap();
        xs.set_index(1, 5).unwrap();

        let paths = store.changed_paths();
        assert!(paths.contains(&Path::key("xs").index(1)));
        assert!(paths.contains(&Path::key("xs")));
    }

    #[test]
    fn test_set_index_pads_with_null() {
        let store = store_with(serde_json::json!({"xs": []}));
        let xs = store.state().child("xs").unwrap();
        xs.set_index(2, 7).unwrap();
        assert_eq!(xs.len(), 3);
        assert_eq!(xs.get_index(0), Some(Value::Null));
        assert_eq!(xs.get_index(2), Some(Value::from(7)));
    }

    #[test]
    fn test_remove_absent_key_is_noop() {
        let store = store_with(serde_json::json!({"a": 1}));
        assert!(!store.state().remove("missing").unwrap());
        assert!(!store.has_changes());
        assert!(store.state().remove("a").unwrap());
        assert!(store.has_changes());
    }

    #[test]
    fn test_internal_keys_bypass_recording() {
        let store = store_with(serde_json::json!({}));
        store.state().set("__host", 1).unwrap();
        assert!(!store.has_changes());
        assert_eq!(store.state().get("__host"), Some(Value::from(1)));
    }

    #[test]
    fn test_replacing_composite_invalidates_wrapper() {
        let store = store_with(serde_json::json!({"user": {"name": "Ada"}}));
        let before = store.state().child("user").unwrap();

        store
            .state()
            .set("user", Value::from(serde_json::json!({"name": "Grace"})))
            .unwrap();

        let after = store.state().child("user").unwrap();
        assert!(!before.ptr_eq(&after));
        assert_eq!(after.get("name"), Some(Value::from("Grace")));
    }

    #[test]
    fn test_mutation_during_notify_does_not_reenter_borrow() {
        // The flush hook reads state; recording must not hold node borrows.
        let store = Rc::new(store_with(serde_json::json!({"a": 1, "b": 2})));
        let store_clone = store.clone();
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        store.set_on_change(move || {
            seen_clone
                .borrow_mut()
                .push(store_clone.state().get("a").unwrap());
        });

        store.state().set("a", 10).unwrap();
        assert_eq!(*seen.borrow(), vec![Value::from(10)]);
    }

    #[test]
    fn test_dead_view_reads_empty_and_writes_fail() {
        let store = store_with(serde_json::json!({"xs": [1]}));
        let xs = store.state().child("xs").unwrap();
        store.mark_inert();

        assert_eq!(xs.get_index(0), None);
        assert_eq!(xs.len(), 0);
        assert_eq!(xs.push(2), Err(StateError::StoreDestroyed));
    }
}
