//! # spark-dom
//!
//! Reactive DOM augmentation for Rust.
//!
//! spark-dom attaches encapsulated, stateful behavior to elements that
//! already exist in a host document: each augmented element owns a state
//! store, a set of delegated event bindings and a render override. State
//! mutations are batched per frame and translated into minimal content
//! updates.
//!
//! ## Architecture
//!
//! ```text
//! state write → ChangeSet → RenderScheduler → ConnectionMachine gate
//!                                           → dispatch (full / per-key partial)
//!                                           → element content + ref index
//! ```
//!
//! Attach/detach is never signaled by application code: a document-wide
//! observer delivers coalesced structural batches, and each component's
//! connection machine derives net transitions from current membership.
//!
//! ## Example
//!
//! ```
//! use spark_dom::{Component, ComponentOptions, Document, Value, pipeline};
//!
//! let doc = Document::new();
//! let el = doc.create_element("div");
//! doc.root().append_child(&el);
//!
//! let counter = Component::augment(&doc, &el,
//!     ComponentOptions::new()
//!         .state(Value::from(serde_json::json!({"count": 0})))
//!         .render(|c| format!("<span>{}</span>", c.get("count").unwrap())));
//!
//! // Constructed while attached: the initial render ran synchronously
//! assert_eq!(el.markup(), "<span>0</span>");
//!
//! // Mutations coalesce into one render at the next frame boundary
//! counter.set("count", 1).unwrap();
//! counter.set("count", 2).unwrap();
//! pipeline::tick(&doc);
//! assert_eq!(el.markup(), "<span>2</span>");
//! ```
//!
//! ## Modules
//!
//! - [`state`] - reactive store, live views, paths, change tracking
//! - [`pipeline`] - frame queue and render scheduler
//! - [`lifecycle`] - connection state machine, document observer
//! - [`dom`] - the in-memory host document model
//! - [`events`] - delegated event bindings
//! - [`component`] - the public augmentation shell

pub mod component;
pub mod dom;
pub mod events;
pub mod lifecycle;
pub mod pipeline;
pub mod state;

// Re-export commonly used items
pub use component::{Component, ComponentOptions, RefIndex, Target};

pub use dom::{Document, Element, Node};

pub use events::{Event, EventHandler, EventRegistry};

pub use lifecycle::{ConnectionMachine, ConnectionStatus, LifecycleFlags, ObserverHooks};

pub use pipeline::{
    FlushHost, FlushOutcome, FrameHandle, RenderError, RenderScheduler, settle, tick,
};

pub use state::{ChangeSet, Path, StateError, StateStore, StateView, Value};
