//! Document observer registrar.
//!
//! One registrar per document (keyed by document identity in a
//! thread-local table) rather than one observer per component: every
//! augmented element in a document shares the same coalesced
//! subscription, and deliveries fan out to registered watchers.
//!
//! Connect/disconnect decisions are made by re-checking each watcher's
//! current live membership against the machine's last-known status - the
//! individual add/remove records in a batch are deliberately not
//! replayed, so a batch that attaches and detaches the same subtree nets
//! out to nothing.
//!
//! Unregistering is safe at any point, including from inside a delivery
//! callback that is tearing its own component down: delivery walks a
//! snapshot of watcher ids and re-checks registration before every call.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::dom::{AttributeRecord, Document, Element, VisibilityRecord};

// =============================================================================
// WATCHERS
// =============================================================================

/// Callbacks a component registers for its element.
pub struct ObserverHooks {
    /// Current live membership, reported once per structural batch.
    pub on_membership: Box<dyn Fn(bool)>,
    /// Attribute change on the watched element.
    pub on_attribute: Box<dyn Fn(&AttributeRecord)>,
    /// Visibility transition for the watched element.
    pub on_visibility: Box<dyn Fn(&VisibilityRecord)>,
}

/// Token returned by [`register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherId(u64);

struct Watcher {
    element: Element,
    hooks: ObserverHooks,
}

struct Registrar {
    watchers: HashMap<u64, Rc<Watcher>>,
}

thread_local! {
    /// Document identity -> registrar.
    static REGISTRARS: RefCell<HashMap<usize, Registrar>> = RefCell::new(HashMap::new());

    static NEXT_WATCHER_ID: RefCell<u64> = const { RefCell::new(1) };
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Watch an element within a document. The returned id unregisters it.
pub fn register(document: &Document, element: &Element, hooks: ObserverHooks) -> WatcherId {
    let id = NEXT_WATCHER_ID.with(|next| {
        let mut next = next.borrow_mut();
        let id = *next;
        *next += 1;
        id
    });
    REGISTRARS.with(|registrars| {
        let mut registrars = registrars.borrow_mut();
        let registrar = registrars
            .entry(document.identity())
            .or_insert_with(|| Registrar {
                watchers: HashMap::new(),
            });
        registrar.watchers.insert(
            id,
            Rc::new(Watcher {
                element: element.clone(),
                hooks,
            }),
        );
    });
    tracing::debug!(id, "watcher registered");
    WatcherId(id)
}

/// Stop watching. Idempotent; the registrar for a document is dropped
/// when its last watcher leaves.
pub fn unregister(document: &Document, id: WatcherId) {
    REGISTRARS.with(|registrars| {
        let mut registrars = registrars.borrow_mut();
        if let Some(registrar) = registrars.get_mut(&document.identity()) {
            registrar.watchers.remove(&id.0);
            if registrar.watchers.is_empty() {
                registrars.remove(&document.identity());
            }
        }
    });
}

/// Number of watchers currently registered for a document.
pub fn watcher_count(document: &Document) -> usize {
    REGISTRARS.with(|registrars| {
        registrars
            .borrow()
            .get(&document.identity())
            .map(|registrar| registrar.watchers.len())
            .unwrap_or(0)
    })
}

/// Drop all registrars (for testing).
pub fn reset_observers() {
    REGISTRARS.with(|registrars| registrars.borrow_mut().clear());
}

// =============================================================================
// DELIVERY
// =============================================================================

fn lookup(document: &Document, id: u64) -> Option<Rc<Watcher>> {
    REGISTRARS.with(|registrars| {
        registrars
            .borrow()
            .get(&document.identity())?
            .watchers
            .get(&id)
            .cloned()
    })
}

fn watcher_ids(document: &Document) -> Vec<u64> {
    REGISTRARS.with(|registrars| {
        registrars
            .borrow()
            .get(&document.identity())
            .map(|registrar| registrar.watchers.keys().copied().collect())
            .unwrap_or_default()
    })
}

/// Deliver everything the document observed since the last delivery, as
/// one batch. Returns whether any records were processed.
pub fn deliver(document: &Document) -> bool {
    let batch = document.take_batch();
    if batch.is_empty() {
        return false;
    }
    // Snapshot: callbacks may register or unregister watchers.
    let ids = watcher_ids(document);

    if batch.structural > 0 {
        tracing::trace!(records = batch.structural, "structural batch");
        for id in &ids {
            // Re-check: an earlier callback may have torn this one down.
            let Some(watcher) = lookup(document, *id) else { continue };
            let attached = document.contains(&watcher.element);
            (watcher.hooks.on_membership)(attached);
        }
    }

    for record in &batch.attributes {
        for id in &ids {
            let Some(watcher) = lookup(document, *id) else { continue };
            if watcher.element.ptr_eq(&record.target) {
                (watcher.hooks.on_attribute)(record);
            }
        }
    }

    for record in &batch.visibility {
        for id in &ids {
            let Some(watcher) = lookup(document, *id) else { continue };
            if watcher.element.ptr_eq(&record.target) {
                (watcher.hooks.on_visibility)(record);
            }
        }
    }

    true
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn hooks(log: Rc<RefCell<Vec<String>>>) -> ObserverHooks {
        let membership_log = log.clone();
        let attribute_log = log.clone();
        ObserverHooks {
            on_membership: Box::new(move |attached| {
                membership_log.borrow_mut().push(format!("member:{attached}"))
            }),
            on_attribute: Box::new(move |record| {
                attribute_log.borrow_mut().push(format!("attr:{}", record.name))
            }),
            on_visibility: Box::new(move |record| {
                log.borrow_mut().push(format!("vis:{}", record.entered))
            }),
        }
    }

    #[test]
    fn test_structural_batch_reports_membership_once() {
        reset_observers();
        let doc = Document::new();
        let el = doc.create_element("div");
        let log = Rc::new(RefCell::new(Vec::new()));
        let _id = register(&doc, &el, hooks(log.clone()));

        // Many structural records, one delivery, one report
        doc.root().append_child(&el);
        doc.root().append_child(&doc.create_element("span"));
        doc.root().append_child(&doc.create_element("span"));
        assert!(deliver(&doc));

        assert_eq!(*log.borrow(), vec!["member:true"]);
    }

    #[test]
    fn test_add_then_remove_in_one_batch_nets_to_detached() {
        reset_observers();
        let doc = Document::new();
        let el = doc.create_element("div");
        let log = Rc::new(RefCell::new(Vec::new()));
        let _id = register(&doc, &el, hooks(log.clone()));

        doc.root().append_child(&el);
        doc.root().remove_child(&el);
        deliver(&doc);

        // The watcher hears the net state, not the intermediate attach
        assert_eq!(*log.borrow(), vec!["member:false"]);
    }

    #[test]
    fn test_empty_batch_delivers_nothing() {
        reset_observers();
        let doc = Document::new();
        assert!(!deliver(&doc));
    }

    #[test]
    fn test_attribute_routing() {
        reset_observers();
        let doc = Document::new();
        let mine = doc.create_element("div");
        let other = doc.create_element("div");
        doc.root().append_child(&mine);
        doc.root().append_child(&other);
        doc.take_batch();

        let log = Rc::new(RefCell::new(Vec::new()));
        let _id = register(&doc, &mine, hooks(log.clone()));

        mine.set_attribute("data-x", "1");
        other.set_attribute("data-y", "2");
        deliver(&doc);

        // Only records for the watched element arrive
        assert_eq!(*log.borrow(), vec!["attr:data-x"]);
    }

    #[test]
    fn test_unregister_from_delivery_callback_is_safe() {
        reset_observers();
        let doc = Document::new();
        let el = doc.create_element("div");
        let log = Rc::new(RefCell::new(Vec::new()));

        let doc_clone = doc.clone();
        let id_slot: Rc<RefCell<Option<WatcherId>>> = Rc::new(RefCell::new(None));
        let slot = id_slot.clone();
        let log_clone = log.clone();
        let id = register(
            &doc,
            &el,
            ObserverHooks {
                on_membership: Box::new(move |attached| {
                    log_clone.borrow_mut().push(format!("member:{attached}"));
                    // Tear ourselves down mid-delivery
                    if let Some(id) = *slot.borrow() {
                        unregister(&doc_clone, id);
                    }
                }),
                on_attribute: Box::new(|_| {}),
                on_visibility: Box::new(|_| {}),
            },
        );
        *id_slot.borrow_mut() = Some(id);

        doc.root().append_child(&el);
        deliver(&doc);

        assert_eq!(*log.borrow(), vec!["member:true"]);
        assert_eq!(watcher_count(&doc), 0);

        // Later deliveries find no watcher and do not call back in
        doc.root().remove_child(&el);
        deliver(&doc);
        assert_eq!(*log.borrow(), vec!["member:true"]);
    }

    #[test]
    fn test_registrar_dropped_when_empty() {
        reset_observers();
        let doc = Document::new();
        let el = doc.create_element("div");
        let id = register(&doc, &el, hooks(Rc::new(RefCell::new(Vec::new()))));
        assert_eq!(watcher_count(&doc), 1);
        unregister(&doc, id);
        unregister(&doc, id);
        assert_eq!(watcher_count(&doc), 0);
    }

    #[test]
    fn test_visibility_routing() {
        reset_observers();
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.root().append_child(&el);
        doc.take_batch();

        let log = Rc::new(RefCell::new(Vec::new()));
        let _id = register(&doc, &el, hooks(log.clone()));
        doc.notify_visibility(&el, true);
        doc.notify_visibility(&el, false);
        deliver(&doc);

        assert_eq!(*log.borrow(), vec!["vis:true", "vis:false"]);
    }
}
