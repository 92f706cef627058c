//! Elements - the in-memory host tree the library augments.
//!
//! An [`Element`] is a cheap `Rc` handle over one tree node: tag, ordered
//! attributes, children (elements and text), parent link. Structural and
//! attribute mutations inside a document tree queue observation records
//! on the owning document; nothing is delivered until the observer drains
//! the batch (see `lifecycle::observer`).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::document::DocumentCore;
use super::markup;

// =============================================================================
// NODE & ELEMENT
// =============================================================================

/// One child slot: an element or a text run.
#[derive(Clone)]
pub enum Node {
    Element(Element),
    Text(String),
}

pub(crate) struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    children: Vec<Node>,
    parent: Option<Weak<RefCell<ElementData>>>,
    /// Set only on a document's root element.
    owner: Option<Weak<DocumentCore>>,
}

/// Handle to a tree node. Clones share the node.
#[derive(Clone)]
pub struct Element {
    inner: Rc<RefCell<ElementData>>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Element {
            inner: Rc::new(RefCell::new(ElementData {
                tag: tag.to_string(),
                attributes: IndexMap::new(),
                children: Vec::new(),
                parent: None,
                owner: None,
            })),
        }
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn tag(&self) -> String {
        self.inner.borrow().tag.clone()
    }

    // =========================================================================
    // ATTRIBUTES
    // =========================================================================

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.borrow().attributes.get(name).cloned()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        let old = self
            .inner
            .borrow_mut()
            .attributes
            .insert(name.to_string(), value.to_string());
        if old.as_deref() == Some(value) {
            return;
        }
        if let Some(doc) = self.owner_document() {
            doc.queue_attribute(self.clone(), name, old, Some(value.to_string()));
        }
    }

    pub fn remove_attribute(&self, name: &str) {
        let old = self.inner.borrow_mut().attributes.shift_remove(name);
        if let Some(old) = old {
            if let Some(doc) = self.owner_document() {
                doc.queue_attribute(self.clone(), name, Some(old), None);
            }
        }
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        self.inner
            .borrow()
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.inner
            .borrow()
            .attributes
            .get("class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    // =========================================================================
    // TREE STRUCTURE
    // =========================================================================

    pub fn parent(&self) -> Option<Element> {
        let weak = self.inner.borrow().parent.clone()?;
        weak.upgrade().map(|inner| Element { inner })
    }

    /// Topmost ancestor (self when detached).
    pub fn root(&self) -> Element {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// The document this element currently lives in, if any.
    pub(crate) fn owner_document(&self) -> Option<Rc<DocumentCore>> {
        self.root().inner.borrow().owner.as_ref()?.upgrade()
    }

    /// Mark this element as a document root.
    pub(crate) fn set_owner(&self, owner: Weak<DocumentCore>) {
        self.inner.borrow_mut().owner = Some(owner);
    }

    /// Append a child element. A child already placed elsewhere is
    /// detached from its old parent first.
    pub fn append_child(&self, child: &Element) {
        child.detach();
        child.inner.borrow_mut().parent = Some(Rc::downgrade(&self.inner));
        self.inner.borrow_mut().children.push(Node::Element(child.clone()));
        if let Some(doc) = self.owner_document() {
            doc.queue_structural();
        }
    }

    pub fn append_text(&self, text: &str) {
        self.inner
            .borrow_mut()
            .children
            .push(Node::Text(text.to_string()));
        if let Some(doc) = self.owner_document() {
            doc.queue_structural();
        }
    }

    /// Remove a direct child. No-op when `child` is not ours.
    pub fn remove_child(&self, child: &Element) {
        // Capture the owning document before the subtree is unlinked.
        let doc = self.owner_document();
        let mut data = self.inner.borrow_mut();
        let before = data.children.len();
        data.children.retain(|node| match node {
            Node::Element(el) => !el.ptr_eq(child),
            Node::Text(_) => true,
        });
        if data.children.len() == before {
            return;
        }
        drop(data);
        child.inner.borrow_mut().parent = None;
        if let Some(doc) = doc {
            doc.queue_structural();
        }
    }

    /// Unlink from the current parent, if any.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    /// Direct element children.
    pub fn children(&self) -> Vec<Element> {
        self.inner
            .borrow()
            .children
            .iter()
            .filter_map(|node| match node {
                Node::Element(el) => Some(el.clone()),
                Node::Text(_) => None,
            })
            .collect()
    }

    pub(crate) fn child_nodes(&self) -> Vec<Node> {
        self.inner.borrow().children.clone()
    }

    // =========================================================================
    // CONTENT
    // =========================================================================

    /// Replace all children by parsing a markup string. This is what a
    /// render pass does with the override's return value.
    pub fn set_markup(&self, markup_text: &str) {
        let doc = self.owner_document();
        let parsed = markup::parse(markup_text);
        {
            let mut data = self.inner.borrow_mut();
            for node in &data.children {
                if let Node::Element(el) = node {
                    el.inner.borrow_mut().parent = None;
                }
            }
            data.children = parsed;
        }
        for child in self.children() {
            child.inner.borrow_mut().parent = Some(Rc::downgrade(&self.inner));
        }
        if let Some(doc) = doc {
            doc.queue_structural();
        }
    }

    /// Serialize the children back to markup.
    pub fn markup(&self) -> String {
        markup::serialize(&self.inner.borrow().children)
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Match against a simple selector: `tag`, `#id`, `.class`,
    /// `[attr=value]`, or a compound of those (`button.add`).
    pub fn matches(&self, selector: &str) -> bool {
        selector
            .split(',')
            .map(str::trim)
            .any(|simple| self.matches_simple(simple))
    }

    fn matches_simple(&self, selector: &str) -> bool {
        if selector.is_empty() {
            return false;
        }
        for part in split_selector(selector) {
            let ok = match part {
                SelectorPart::Tag(tag) => self.inner.borrow().tag == tag,
                SelectorPart::Id(id) => self.attribute("id").as_deref() == Some(id),
                SelectorPart::Class(class) => self.has_class(class),
                SelectorPart::Attr(name, value) => {
                    self.attribute(name).as_deref() == Some(value)
                }
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// First matching descendant (depth-first).
    pub fn query(&self, selector: &str) -> Option<Element> {
        for child in self.children() {
            if child.matches(selector) {
                return Some(child);
            }
            if let Some(found) = child.query(selector) {
                return Some(found);
            }
        }
        None
    }

    /// All matching descendants (depth-first order).
    pub fn query_all(&self, selector: &str) -> Vec<Element> {
        let mut out = Vec::new();
        self.walk(&mut |el| {
            if el.matches(selector) {
                out.push(el.clone());
            }
        });
        out
    }

    /// Visit every descendant element, depth-first.
    pub fn walk(&self, visit: &mut dyn FnMut(&Element)) {
        for child in self.children() {
            visit(&child);
            child.walk(visit);
        }
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.inner.borrow().tag)
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in element.child_nodes() {
        match node {
            Node::Text(text) => out.push_str(&text),
            Node::Element(el) => collect_text(&el, out),
        }
    }
}

// =============================================================================
// SELECTOR SPLITTING
// =============================================================================

enum SelectorPart<'a> {
    Tag(&'a str),
    Id(&'a str),
    Class(&'a str),
    Attr(&'a str, &'a str),
}

/// Split a compound simple selector into its parts.
fn split_selector(selector: &str) -> Vec<SelectorPart<'_>> {
    let mut parts = Vec::new();
    let mut rest = selector;
    while !rest.is_empty() {
        let (part, remainder) = match rest.as_bytes()[0] {
            b'#' => take_ident(&rest[1..], SelectorPart::Id),
            b'.' => take_ident(&rest[1..], SelectorPart::Class),
            b'[' => {
                let close = rest.find(']').unwrap_or(rest.len());
                let body = &rest[1..close];
                let remainder = &rest[(close + 1).min(rest.len())..];
                let (name, value) = match body.split_once('=') {
                    Some((name, value)) => (name, value.trim_matches('"')),
                    None => (body, ""),
                };
                (SelectorPart::Attr(name, value), remainder)
            }
            _ => take_ident(rest, SelectorPart::Tag),
        };
        parts.push(part);
        if remainder.len() == rest.len() {
            break;
        }
        rest = remainder;
    }
    parts
}

fn take_ident<'a>(
    rest: &'a str,
    build: impl FnOnce(&'a str) -> SelectorPart<'a>,
) -> (SelectorPart<'a>, &'a str) {
    let end = rest
        .find(|c: char| matches!(c, '#' | '.' | '['))
        .unwrap_or(rest.len());
    (build(&rest[..end]), &rest[end..])
}

// =============================================================================
// TESTS
// =============================================================================
