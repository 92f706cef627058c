//! Lifecycle Module - Connection state machine and document observation
//!
//! - **ConnectionMachine** - per-component attach/detach state machine;
//!   fires hooks, gates the first render, tears down on detach
//! - **observer** - process-wide registrar, one coalesced subscription
//!   per document, fanning deliveries out to registered watchers

mod connection;
pub mod observer;

pub use connection::{ConnectionHost, ConnectionMachine, ConnectionStatus, LifecycleFlags};
pub use observer::{ObserverHooks, WatcherId};
