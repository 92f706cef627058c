//! Change set - the paths mutated since the last flush.
//!
//! Recording a path also records its immediate parent (top-level paths
//! have none), so listeners keyed on first-level keys still observe
//! changes to nested descendants.

use indexmap::IndexSet;

use super::path::Path;

// =============================================================================
// CHANGE SET
// =============================================================================

/// Unordered collection of distinct changed paths. Iteration follows
/// insertion order, which keeps flush dispatch deterministic.
#[derive(Default, Debug)]
pub struct ChangeSet {
    paths: IndexSet<Path>,
}

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet::default()
    }

    /// Record a changed path and its immediate parent.
    pub fn record(&mut self, path: Path) {
        if path.is_root() {
            return;
        }
        if let Some(parent) = path.parent() {
            self.paths.insert(parent);
        }
        self.paths.insert(path);
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter()
    }

    /// Distinct top-level keys across all recorded paths, in first-seen order.
    pub fn top_level_keys(&self) -> Vec<String> {
        let mut keys: IndexSet<&str> = IndexSet::new();
        for path in &self.paths {
            keys.insert(path.top_level());
        }
        keys.into_iter().map(str::to_string).collect()
    }

    /// Drain this set, leaving it empty.
    pub fn take(&mut self) -> ChangeSet {
        ChangeSet {
            paths: std::mem::take(&mut self.paths),
        }
    }

    /// Merge another set back in (used when a flush is skipped while
    /// detached and its changes must survive until attach).
    pub fn merge(&mut self, other: ChangeSet) {
        for path in other.paths {
            self.paths.insert(path);
        }
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_adds_parent() {
        let mut set = ChangeSet::new();
        set.record(Path::key("a").child("b").child("c"));

        assert!(set.contains(&Path::key("a").child("b").child("c")));
        assert!(set.contains(&Path::key("a").child("b")));
        // Only the immediate parent, not the whole ancestor chain
        assert!(!set.contains(&Path::key("a")));
    }

    #[test]
    fn test_record_top_level_has_no_parent_entry() {
        let mut set = ChangeSet::new();
        set.record(Path::key("count"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_top_level_keys_dedup() {
        let mut set = ChangeSet::new();
        set.record(Path::key("user").child("name"));
        set.record(Path::key("user").child("age"));
        set.record(Path::key("todos"));
        assert_eq!(set.top_level_keys(), vec!["user", "todos"]);
    }

    #[test]
    fn test_take_leaves_empty() {
        let mut set = ChangeSet::new();
        set.record(Path::key("x"));
        let drained = set.take();
        assert!(set.is_empty());
        assert_eq!(drained.len(), 1);
    }

    #[test]
    fn test_merge() {
        let mut set = ChangeSet::new();
        set.record(Path::key("x"));
        let drained = set.take();
        set.record(Path::key("y"));
        set.merge(drained);
        assert!(set.contains(&Path::key("x")));
        assert!(set.contains(&Path::key("y")));
    }
}
