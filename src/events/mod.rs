//! Events Module - Delegated event handling
//!
//! Components register `(kind, selector, handler)` bindings instead of
//! per-element listeners. Dispatch walks the event target's ancestor
//! chain up to the component root, so handlers keep working for elements
//! created by later renders. Handlers always receive the owning component
//! as an explicit first argument; there is no implicit context.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::Component;
use crate::dom::Element;

// =============================================================================
// EVENTS
// =============================================================================

/// A dispatched event: a kind plus the element it happened on.
#[derive(Clone)]
pub struct Event {
    kind: String,
    target: Element,
}

impl Event {
    pub fn new(kind: &str, target: &Element) -> Self {
        Event {
            kind: kind.to_string(),
            target: target.clone(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn target(&self) -> &Element {
        &self.target
    }
}

/// Handler signature: the owning component arrives explicitly.
pub type EventHandler = Rc<dyn Fn(&Component, &Event)>;

struct EventBinding {
    kind: String,
    selector: Option<String>,
    handler: EventHandler,
}

// =============================================================================
// EVENT REGISTRY
// =============================================================================

/// Per-component listener bookkeeping: register on attach, release on
/// destroy, nothing survives teardown.
#[derive(Default)]
pub struct EventRegistry {
    bindings: RefCell<Vec<EventBinding>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        EventRegistry::default()
    }

    pub fn add(&self, kind: &str, selector: Option<&str>, handler: EventHandler) {
        self.bindings.borrow_mut().push(EventBinding {
            kind: kind.to_string(),
            selector: selector.map(str::to_string),
            handler,
        });
    }

    pub fn len(&self) -> usize {
        self.bindings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty()
    }

    /// Release every binding (teardown).
    pub fn clear(&self) {
        self.bindings.borrow_mut().clear();
    }

    /// Dispatch an event whose target lives under `root`. Returns the
    /// number of handlers invoked.
    pub fn dispatch(&self, component: &Component, event: &Event, root: &Element) -> usize {
        // Handlers may add/remove bindings; don't hold the borrow.
        let matching: Vec<EventHandler> = self
            .bindings
            .borrow()
            .iter()
            .filter(|binding| binding.kind == event.kind)
            .filter(|binding| delegate_match(binding.selector.as_deref(), &event.target, root))
            .map(|binding| binding.handler.clone())
            .collect();
        for handler in &matching {
            handler(component, event);
        }
        matching.len()
    }
}

/// Delegation check: does the target, or any of its ancestors up to and
/// including the root, match the selector? `None` matches everything
/// under the root.
fn delegate_match(selector: Option<&str>, target: &Element, root: &Element) -> bool {
    let Some(selector) = selector else {
        return true;
    };
    let mut current = target.clone();
    loop {
        if current.matches(selector) {
            return true;
        }
        if current.ptr_eq(root) {
            return false;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
