//! DOM Module - In-memory host document model
//!
//! The minimal tree the library augments:
//!
//! - **Element / Node** - `Rc`-shared tree nodes with attributes,
//!   selector queries, markup content
//! - **Document** - root element, membership checks, and the three
//!   coalesced observation queues (structural / attribute / visibility)
//! - **markup** - lenient parse/serialize for render output

mod document;
mod element;
pub mod markup;

pub use document::{AttributeRecord, Document, ObservationBatch, VisibilityRecord};
pub use element::{Element, Node};
