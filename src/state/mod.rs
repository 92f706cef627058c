//! State Module - Reactive state store and change tracking
//!
//! The store wraps a plain value tree so that mutation through its live
//! views is observable at any depth:
//!
//! - **Value** - dynamic tree nodes with `Rc` identity for composites
//! - **Path** - dot-joined addresses into the tree
//! - **ChangeSet** - distinct paths mutated since the last flush
//! - **StateStore / StateView** - wrapper-cached live views; writes
//!   record paths and request a flush

mod changes;
mod path;
mod store;
mod value;
mod view;

pub use changes::ChangeSet;
pub use path::Path;
pub use store::{StateError, StateStore};
pub use value::{ListNode, MapNode, Value};
pub use view::StateView;
