//! Documents - the live tree plus its observation queues.
//!
//! A document owns one root element. Membership (`contains`) is what the
//! connection machinery cares about; the three observation queues
//! (structural, attribute, visibility) collect records as mutations
//! happen and hand them out as one coalesced batch at delivery time.

use std::cell::RefCell;
use std::rc::Rc;

use super::element::Element;

// =============================================================================
// OBSERVATION RECORDS
// =============================================================================

/// Attribute change inside the document tree.
#[derive(Clone)]
pub struct AttributeRecord {
    pub target: Element,
    pub name: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Visibility transition reported for an element.
#[derive(Clone)]
pub struct VisibilityRecord {
    pub target: Element,
    pub entered: bool,
}

/// One coalesced batch of everything observed since the last delivery.
#[derive(Default)]
pub struct ObservationBatch {
    /// Count of structural (child list) records. The individual records
    /// carry no detail: connect/disconnect decisions are made by
    /// re-checking live membership, never by replaying adds/removes.
    pub structural: usize,
    pub attributes: Vec<AttributeRecord>,
    pub visibility: Vec<VisibilityRecord>,
}

impl ObservationBatch {
    pub fn is_empty(&self) -> bool {
        self.structural == 0 && self.attributes.is_empty() && self.visibility.is_empty()
    }
}

// =============================================================================
// DOCUMENT
// =============================================================================

pub(crate) struct DocumentCore {
    root: Element,
    structural: RefCell<usize>,
    attributes: RefCell<Vec<AttributeRecord>>,
    visibility: RefCell<Vec<VisibilityRecord>>,
}

impl DocumentCore {
    pub(crate) fn queue_structural(&self) {
        *self.structural.borrow_mut() += 1;
    }

    pub(crate) fn queue_attribute(
        &self,
        target: Element,
        name: &str,
        old: Option<String>,
        new: Option<String>,
    ) {
        self.attributes.borrow_mut().push(AttributeRecord {
            target,
            name: name.to_string(),
            old,
            new,
        });
    }
}

/// Handle to a document. Clones share the document.
#[derive(Clone)]
pub struct Document {
    core: Rc<DocumentCore>,
}

impl Document {
    /// Create a document with an empty root element.
    pub fn new() -> Self {
        let root = Element::new("body");
        let core = Rc::new(DocumentCore {
            root: root.clone(),
            structural: RefCell::new(0),
            attributes: RefCell::new(Vec::new()),
            visibility: RefCell::new(Vec::new()),
        });
        root.set_owner(Rc::downgrade(&core));
        Document { core }
    }

    /// The root element.
    pub fn root(&self) -> Element {
        self.core.root.clone()
    }

    /// Create a detached element (not part of the tree until appended).
    pub fn create_element(&self, tag: &str) -> Element {
        Element::new(tag)
    }

    /// Whether the element is currently part of this document's tree.
    pub fn contains(&self, element: &Element) -> bool {
        element.root().ptr_eq(&self.root())
    }

    pub fn query(&self, selector: &str) -> Option<Element> {
        self.root().query(selector)
    }

    pub fn query_all(&self, selector: &str) -> Vec<Element> {
        self.root().query_all(selector)
    }

    /// Report a visibility transition (the intersection-observation
    /// analog). Queued like any other observation; delivered in batch.
    pub fn notify_visibility(&self, element: &Element, entered: bool) {
        self.core.visibility.borrow_mut().push(VisibilityRecord {
            target: element.clone(),
            entered,
        });
    }

    /// Drain everything observed since the last delivery.
    pub(crate) fn take_batch(&self) -> ObservationBatch {
        ObservationBatch {
            structural: std::mem::take(&mut *self.core.structural.borrow_mut()),
            attributes: std::mem::take(&mut *self.core.attributes.borrow_mut()),
            visibility: std::mem::take(&mut *self.core.visibility.borrow_mut()),
        }
    }

    pub fn has_pending_observations(&self) -> bool {
        *self.core.structural.borrow() > 0
            || !self.core.attributes.borrow().is_empty()
            || !self.core.visibility.borrow().is_empty()
    }

    /// Stable identity for registrar keying.
    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.core) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let doc = Document::new();
        let el = doc.create_element("div");
        assert!(!doc.contains(&el));

        doc.root().append_child(&el);
        assert!(doc.contains(&el));

        // Detaching a whole subtree removes nested membership too
        let inner = doc.create_element("span");
        el.append_child(&inner);
        assert!(doc.contains(&inner));
        doc.root().remove_child(&el);
        assert!(!doc.contains(&el));
        assert!(!doc.contains(&inner));
    }

    #[test]
    fn test_structural_records_batch() {
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.root().append_child(&el);
        doc.root().remove_child(&el);

        let batch = doc.take_batch();
        assert_eq!(batch.structural, 2);
        // Drained
        assert!(doc.take_batch().is_empty());
    }

    #[test]
    fn test_detached_mutations_are_not_observed() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let child = doc.create_element("span");
        el.append_child(&child);
        el.set_attribute("id", "x");

        assert!(doc.take_batch().is_empty());
    }

    #[test]
    fn test_attribute_records() {
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.root().append_child(&el);
        doc.take_batch();

        el.set_attribute("data-mode", "dark");
        el.set_attribute("data-mode", "dark"); // unchanged, not recorded
        el.set_attribute("data-mode", "light");
        el.remove_attribute("data-mode");

        let batch = doc.take_batch();
        assert_eq!(batch.attributes.len(), 3);
        assert_eq!(batch.attributes[0].old, None);
        assert_eq!(batch.attributes[0].new.as_deref(), Some("dark"));
        assert_eq!(batch.attributes[2].new, None);
    }

    #[test]
    fn test_visibility_records() {
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.notify_visibility(&el, true);

        let batch = doc.take_batch();
        assert_eq!(batch.visibility.len(), 1);
        assert!(batch.visibility[0].entered);
    }
}
