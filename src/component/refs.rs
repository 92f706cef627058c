//! Reference index - logical names for rendered elements.
//!
//! Descendants carrying a `ref="name"` attribute are indexed by name so
//! application code and render-map targets can find them after any
//! render replaced the subtree. The scheduler refreshes the index once
//! after every render pass.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::dom::Element;

// =============================================================================
// REF INDEX
// =============================================================================

#[derive(Default)]
pub struct RefIndex {
    map: RefCell<HashMap<String, Element>>,
}

impl RefIndex {
    pub fn new() -> Self {
        RefIndex::default()
    }

    /// Re-walk the subtree and rebuild the index. Later duplicates of a
    /// name win, matching document order expectations.
    pub fn refresh(&self, root: &Element) {
        let mut map = HashMap::new();
        root.walk(&mut |el| {
            if let Some(name) = el.attribute("ref") {
                map.insert(name, el.clone());
            }
        });
        *self.map.borrow_mut() = map;
    }

    /// Current element for a reference name.
    pub fn get(&self, name: &str) -> Option<Element> {
        self.map.borrow().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.map.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.map.borrow_mut().clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_tracks_current_elements() {
        let root = Element::new("div");
        root.set_markup(r#"<span ref="label">one</span>"#);

        let refs = RefIndex::new();
        refs.refresh(&root);
        let first = refs.get("label").unwrap();
        assert_eq!(first.text_content(), "one");

        // Render replaces the subtree; a refresh re-points the name
        root.set_markup(r#"<b ref="label">two</b><i ref="icon"></i>"#);
        refs.refresh(&root);
        let second = refs.get("label").unwrap();
        assert_eq!(second.text_content(), "two");
        assert!(!first.ptr_eq(&second));
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn test_clear() {
        let root = Element::new("div");
        root.set_markup(r#"<span ref="x"></span>"#);
        let refs = RefIndex::new();
        refs.refresh(&root);
        refs.clear();
        assert!(refs.get("x").is_none());
    }
}
