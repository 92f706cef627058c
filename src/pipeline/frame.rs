//! Frame queue - the animation-frame boundary.
//!
//! Flush callbacks are scheduled against the next frame and run when the
//! event-loop driver calls [`run_frame`] (usually via `pipeline::tick`).
//! Callbacks scheduled while a frame is running land in the *next* frame,
//! and a callback canceled mid-frame never runs, even if the frame had
//! already started when the cancellation happened.

use std::cell::RefCell;

// =============================================================================
// FRAME QUEUE
// =============================================================================

struct FrameQueue {
    next_id: u64,
    callbacks: Vec<(u64, Box<dyn FnOnce()>)>,
}

thread_local! {
    static FRAME_QUEUE: RefCell<FrameQueue> = RefCell::new(FrameQueue {
        next_id: 1,
        callbacks: Vec::new(),
    });
}

/// Token for a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHandle(u64);

/// Schedule a callback for the next frame.
pub fn request_frame(callback: impl FnOnce() + 'static) -> FrameHandle {
    FRAME_QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        let id = queue.next_id;
        queue.next_id += 1;
        queue.callbacks.push((id, Box::new(callback)));
        FrameHandle(id)
    })
}

/// Cancel a scheduled callback. Safe to call at any time, including from
/// inside another callback of the same frame.
pub fn cancel_frame(handle: FrameHandle) {
    FRAME_QUEUE.with(|queue| {
        queue
            .borrow_mut()
            .callbacks
            .retain(|(id, _)| *id != handle.0);
    })
}

/// Run one frame: every callback scheduled before this call, in order.
/// Returns how many callbacks ran.
pub fn run_frame() -> usize {
    // Watermark: ids handed out after this point belong to the next frame.
    let watermark = FRAME_QUEUE.with(|queue| queue.borrow().next_id);
    let mut ran = 0;
    loop {
        // Re-borrow each iteration: a callback may schedule or cancel.
        let next = FRAME_QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            let due = matches!(queue.callbacks.first(), Some((id, _)) if *id < watermark);
            if due {
                Some(queue.callbacks.remove(0).1)
            } else {
                None
            }
        });
        match next {
            Some(callback) => {
                callback();
                ran += 1;
            }
            None => return ran,
        }
    }
}

/// Number of callbacks currently scheduled.
pub fn pending_frames() -> usize {
    FRAME_QUEUE.with(|queue| queue.borrow().callbacks.len())
}

/// Drop everything scheduled (for testing).
pub fn reset_frames() {
    FRAME_QUEUE.with(|queue| queue.borrow_mut().callbacks.clear());
}

// =============================================================================
// TESTS
// =============================================================================
