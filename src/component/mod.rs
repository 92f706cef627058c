//! Component Module - The augmentation shell
//!
//! A [`Component`] ties one element to one state store, one render
//! scheduler and one connection machine, and wires them together:
//!
//! 1. state writes record paths and ask the scheduler for a flush
//! 2. the scheduler's flush consults the connection machine and the
//!    dispatch declarations, then renders into the element
//! 3. the document observer drives attach/detach transitions, which gate
//!    rendering and eventually tear everything down
//!
//! Handles are cheap clones; dropping the last handle of a still-watched
//! component lets the next observer delivery clean the watcher up.

mod options;
mod refs;

pub use options::{
    AttributeHookFn, ComponentOptions, DirectRenderFn, HookFn, RenderFn, Target,
    VisibilityHookFn,
};
pub use refs::RefIndex;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::dom::{Document, Element};
use crate::events::{Event, EventRegistry};
use crate::lifecycle::{observer, ConnectionHost, ConnectionMachine, ConnectionStatus, ObserverHooks, WatcherId};
use crate::pipeline::{FlushHost, FlushOutcome, RenderError, RenderScheduler};
use crate::state::{ChangeSet, StateError, StateStore, StateView, Value};

use options::{RenderKind, RenderMapEntry};

// =============================================================================
// COMPONENT
// =============================================================================

struct ComponentConfig {
    render: RenderKind,
    render_map: indexmap::IndexMap<String, RenderMapEntry>,
    render_props: Option<Vec<String>>,
    on_connect: Option<HookFn>,
    on_disconnect: Option<HookFn>,
    on_attribute: Option<AttributeHookFn>,
    on_visibility: Option<VisibilityHookFn>,
}

pub(crate) struct ComponentInner {
    document: Document,
    element: Element,
    store: StateStore,
    scheduler: RenderScheduler,
    machine: ConnectionMachine,
    refs: RefIndex,
    events: EventRegistry,
    config: ComponentConfig,
    watcher: Cell<Option<WatcherId>>,
    weak_self: RefCell<Weak<ComponentInner>>,
}

/// Handle to an augmented element. Clones share the component.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

impl Component {
    // =========================================================================
    // CONSTRUCTION
    // =========================================================================

    /// Augment an element with state, rendering and lifecycle tracking.
    ///
    /// When the element is already part of the document, the attach
    /// transition (connect hook, initial render) runs synchronously
    /// before this returns. Otherwise it runs at the observer delivery
    /// that first finds the element in the tree.
    pub fn augment(document: &Document, element: &Element, options: ComponentOptions) -> Component {
        let ComponentOptions {
            state,
            reactive,
            render_on_create,
            render,
            render_map,
            render_props,
            on_connect,
            on_disconnect,
            on_attribute,
            on_visibility,
            events,
        } = options;

        let inner = Rc::new(ComponentInner {
            document: document.clone(),
            element: element.clone(),
            store: StateStore::new(state, reactive),
            scheduler: RenderScheduler::new(),
            machine: ConnectionMachine::new(render_on_create),
            refs: RefIndex::new(),
            events: EventRegistry::new(),
            config: ComponentConfig {
                render,
                render_map,
                render_props,
                on_connect,
                on_disconnect,
                on_attribute,
                on_visibility,
            },
            watcher: Cell::new(None),
            weak_self: RefCell::new(Weak::new()),
        });
        *inner.weak_self.borrow_mut() = Rc::downgrade(&inner);

        for (kind, selector, handler) in events {
            inner.events.add(&kind, selector.as_deref(), handler);
        }

        // State writes request flushes.
        let scheduler = inner.scheduler.clone();
        inner.store.set_on_change(move || scheduler.request_flush());

        // Flush bodies run through the scheduler's dispatch logic. The
        // frame-driven path logs and drops errors; `flush_now` exposes
        // them synchronously instead.
        let weak = Rc::downgrade(&inner);
        inner.scheduler.install(move || {
            let Some(inner) = weak.upgrade() else { return };
            if let Err(err) = inner.scheduler.flush(&*inner) {
                tracing::error!(%err, "render flush failed");
            }
        });

        // One watcher on the document observer drives the lifecycle.
        let id_slot: Rc<Cell<Option<WatcherId>>> = Rc::new(Cell::new(None));
        let membership = {
            let weak = Rc::downgrade(&inner);
            let document = document.clone();
            let id_slot = id_slot.clone();
            Box::new(move |attached: bool| {
                let Some(inner) = weak.upgrade() else {
                    // Every handle is gone; release the watcher.
                    if let Some(id) = id_slot.get() {
                        observer::unregister(&document, id);
                    }
                    return;
                };
                if attached {
                    inner.machine.signal_attached(&*inner);
                } else {
                    inner.machine.signal_detached(&*inner);
                }
            })
        };
        let attribute = {
            let weak = Rc::downgrade(&inner);
            Box::new(move |record: &crate::dom::AttributeRecord| {
                let Some(inner) = weak.upgrade() else { return };
                if !inner.machine.is_attached() {
                    return;
                }
                if let (Some(hook), Some(component)) =
                    (inner.config.on_attribute.as_ref(), inner.handle())
                {
                    hook(
                        &component,
                        &record.name,
                        record.old.as_deref(),
                        record.new.as_deref(),
                    );
                }
            })
        };
        let visibility = {
            let weak = Rc::downgrade(&inner);
            Box::new(move |record: &crate::dom::VisibilityRecord| {
                let Some(inner) = weak.upgrade() else { return };
                if !inner.machine.is_attached() {
                    return;
                }
                if let (Some(hook), Some(component)) =
                    (inner.config.on_visibility.as_ref(), inner.handle())
                {
                    hook(&component, record.entered);
                }
            })
        };
        let id = observer::register(
            document,
            element,
            ObserverHooks {
                on_membership: membership,
                on_attribute: attribute,
                on_visibility: visibility,
            },
        );
        inner.watcher.set(Some(id));
        id_slot.set(Some(id));

        // Constructed while already attached: run the entry actions now.
        if document.contains(element) {
            inner.machine.signal_attached(&*inner);
        }

        Component { inner }
    }

    /// Augment every element matching `selector`, building options per
    /// element.
    pub fn augment_all(
        document: &Document,
        selector: &str,
        options: impl Fn(&Element) -> ComponentOptions,
    ) -> Vec<Component> {
        document
            .query_all(selector)
            .into_iter()
            .map(|element| Component::augment(document, &element, options(&element)))
            .collect()
    }

    // =========================================================================
    // STATE
    // =========================================================================

    /// The live root state view.
    pub fn state(&self) -> StateView {
        self.inner.store.state()
    }

    /// Shallow merge into the root state.
    pub fn set_state(&self, partial: impl Into<Value>) -> Result<bool, StateError> {
        self.inner.store.set_state(partial.into())
    }

    /// Read a top-level property.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state().get(key)
    }

    /// Write a top-level property.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<bool, StateError> {
        self.state().set(key, value)
    }

    // =========================================================================
    // TREE & REFS
    // =========================================================================

    pub fn element(&self) -> Element {
        self.inner.element.clone()
    }

    pub fn document(&self) -> Document {
        self.inner.document.clone()
    }

    /// Current element for a `ref="name"` descendant.
    pub fn ref_element(&self, name: &str) -> Option<Element> {
        self.inner.refs.get(name)
    }

    pub fn ref_names(&self) -> Vec<String> {
        self.inner.refs.names()
    }

    // =========================================================================
    // LIFECYCLE & RENDERING
    // =========================================================================

    pub fn status(&self) -> ConnectionStatus {
        self.inner.machine.status()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.machine.is_attached()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.machine.is_inert()
    }

    /// Whether the one initial render has happened.
    pub fn has_rendered(&self) -> bool {
        self.inner.machine.has_rendered()
    }

    /// Run any pending flush synchronously instead of waiting for the
    /// next frame. Surfaces render-map resolution errors.
    pub fn flush_now(&self) -> Result<FlushOutcome, RenderError> {
        self.inner.scheduler.flush(&*self.inner)
    }

    /// Dispatch a delegated event. Inert components never invoke
    /// handlers. Returns the number of handlers that ran.
    pub fn dispatch(&self, event: &Event) -> usize {
        if self.inner.machine.is_inert() {
            return 0;
        }
        self.inner.events.dispatch(self, event, &self.inner.element)
    }

    /// Explicit teardown: cancel any pending flush, release observation
    /// and listeners, and make the state store reject further writes.
    /// Idempotent; does not fire the disconnect hook.
    pub fn destroy(&self) {
        self.inner.machine.destroy(&*self.inner);
    }
}

// =============================================================================
// SEAM IMPLEMENTATIONS
// =============================================================================

impl ComponentInner {
    fn handle(&self) -> Option<Component> {
        self.weak_self
            .borrow()
            .upgrade()
            .map(|inner| Component { inner })
    }

    /// Resolve a render-map target inside the component root, at use time.
    fn resolve_target(&self, target: &Target) -> Result<Element, RenderError> {
        let found = match target {
            Target::Selector(selector) => self.element.query(selector),
            Target::RefName(name) => self
                .refs
                .get(name)
                .or_else(|| self.element.query(&format!("[ref={name}]"))),
        };
        found.ok_or_else(|| RenderError::TargetNotFound {
            target: target.describe(),
        })
    }
}

impl FlushHost for ComponentInner {
    fn is_connected(&self) -> bool {
        self.machine.is_attached() && !self.machine.is_inert()
    }

    fn take_changes(&self) -> ChangeSet {
        self.store.take_changes()
    }

    fn render_props(&self) -> Option<Vec<String>> {
        self.config.render_props.clone()
    }

    fn render_map_keys(&self) -> Option<Vec<String>> {
        if self.config.render_map.is_empty() {
            None
        } else {
            Some(self.config.render_map.keys().cloned().collect())
        }
    }

    fn render_full(&self) -> Result<(), RenderError> {
        let Some(component) = self.handle() else {
            return Ok(());
        };
        match &self.config.render {
            RenderKind::None => {}
            RenderKind::Markup(render) => {
                let markup = render(&component);
                self.element.set_markup(&markup);
            }
            RenderKind::Direct(render) => render(&component),
        }
        Ok(())
    }

    fn render_partial(&self, key: &str) -> Result<(), RenderError> {
        let Some(entry) = self.config.render_map.get(key) else {
            return Ok(());
        };
        let Some(component) = self.handle() else {
            return Ok(());
        };
        let target = self.resolve_target(&entry.target)?;
        let markup = (entry.render)(&component);
        target.set_markup(&markup);
        Ok(())
    }

    fn refresh_refs(&self) {
        self.refs.refresh(&self.element);
    }
}

impl ConnectionHost for ComponentInner {
    fn connect_hook(&self) {
        if let (Some(hook), Some(component)) = (self.config.on_connect.as_ref(), self.handle()) {
            hook(&component);
        }
    }

    fn disconnect_hook(&self) {
        if let (Some(hook), Some(component)) = (self.config.on_disconnect.as_ref(), self.handle())
        {
            hook(&component);
        }
    }

    fn initial_render(&self) {
        // The initial render reflects all current state; drain the set
        // first so mutations made *during* the render survive into a
        // fresh flush instead of being wiped afterwards.
        self.store.clear_changed_paths();
        if let Err(err) = self.render_full() {
            tracing::error!(%err, "initial render failed");
        }
        self.refresh_refs();
    }

    fn resume_renders(&self) {
        if self.store.has_changes() {
            self.scheduler.request_flush();
        }
    }

    fn teardown(&self) {
        self.scheduler.mark_inert();
        if let Some(id) = self.watcher.take() {
            observer::unregister(&self.document, id);
        }
        self.events.clear();
        self.store.mark_inert();
        self.refs.clear();
    }
}
