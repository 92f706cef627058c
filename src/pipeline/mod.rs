//! Pipeline Module - Frame boundary and render scheduling
//!
//! ## Data Flow
//!
//! 1. A state write records a path and calls the store's flush hook
//! 2. **RenderScheduler** coalesces hook calls into one pending frame
//!    callback per component
//! 3. The event-loop driver calls [`tick`]: observation batches are
//!    delivered (connect/disconnect decisions), then the frame runs
//! 4. Each flush consults the connection gate, the should-render policy
//!    and the dispatch policy before touching the host tree
//!
//! - **frame** - the animation-frame queue
//! - **RenderScheduler** - per-component coalescing and dispatch

pub mod frame;
mod scheduler;

pub use frame::{FrameHandle, cancel_frame, pending_frames, request_frame, reset_frames, run_frame};
pub use scheduler::{FlushHost, FlushOutcome, RenderError, RenderScheduler};

use crate::dom::Document;
use crate::lifecycle::observer;

/// One cooperative event-loop turn: deliver the document's observation
/// batch (connect/disconnect decisions, attribute and visibility
/// notifications), then run one frame of scheduled flushes. Returns
/// whether any work happened.
pub fn tick(document: &Document) -> bool {
    let delivered = observer::deliver(document);
    let ran = run_frame();
    delivered || ran > 0
}

/// Tick until nothing is left to do (bounded, in case a render keeps
/// scheduling more work). Returns the number of turns taken.
pub fn settle(document: &Document) -> usize {
    let mut turns = 0;
    while turns < 64 && tick(document) {
        turns += 1;
    }
    turns
}
