//! Render scheduler - coalesced flushing with selective dispatch.
//!
//! Any number of state mutations before the next frame boundary collapse
//! into a single flush: the first change requests a frame callback, and
//! further requests are no-ops while that token is outstanding. The flush
//! itself consults the connection gate, the should-render policy
//! (`renderProps`) and the dispatch policy (render map) before touching
//! the host tree.
//!
//! Note one deliberate simplification inherited by the dispatch policy:
//! granular dispatch is all-or-nothing per flush. A single changed key
//! without a render-map entry forces a full render for the whole flush,
//! even for keys that do have entries. With large render maps this can be
//! surprising; it is the intended behavior, not an accident.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::state::ChangeSet;

use super::frame::{self, FrameHandle};

// =============================================================================
// RENDER ERROR
// =============================================================================

/// Error surfaced by a flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A render-map entry's target resolved to nothing inside the root.
    TargetNotFound {
        /// The selector or reference name that failed to resolve.
        target: String,
    },
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::TargetNotFound { target } => {
                write!(f, "render target not found: {target}")
            }
        }
    }
}

impl std::error::Error for RenderError {}

// =============================================================================
// FLUSH HOST
// =============================================================================

/// What the scheduler needs from the component shell to run one flush.
/// Render exceptions (panics) propagate through these calls untouched;
/// the scheduler only guarantees its own token is already clear.
pub trait FlushHost {
    /// Connection gate: may a render touch the tree right now?
    fn is_connected(&self) -> bool;

    /// Drain the accumulated change set. Only called once the connection
    /// gate has passed: a flush skipped while detached leaves the set
    /// untouched for the attach transition to pick up.
    fn take_changes(&self) -> ChangeSet;

    /// The declared `renderProps` allow-list, if any.
    fn render_props(&self) -> Option<Vec<String>>;

    /// The declared render-map keys, or `None` when no map is declared.
    fn render_map_keys(&self) -> Option<Vec<String>>;

    fn render_full(&self) -> Result<(), RenderError>;

    fn render_partial(&self, key: &str) -> Result<(), RenderError>;

    /// Re-index reference-marked descendants after a render pass.
    fn refresh_refs(&self);
}

/// What one flush ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing to do: inert, detached, or an empty change set.
    Skipped,
    /// Changes existed but none of their top-level keys passed the
    /// `renderProps` allow-list. The change set is consumed.
    Gated,
    /// One full render ran.
    Full,
    /// This many partial renders ran (one per changed mapped key).
    Partial(usize),
}

// =============================================================================
// RENDER SCHEDULER
// =============================================================================

struct SchedulerInner {
    pending: Cell<Option<FrameHandle>>,
    inert: Cell<bool>,
    /// The flush body, installed by the component at wiring time.
    on_flush: RefCell<Option<Rc<dyn Fn()>>>,
}

/// Per-component flush coalescing and dispatch. Clones share the
/// scheduler.
#[derive(Clone)]
pub struct RenderScheduler {
    inner: Rc<SchedulerInner>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        RenderScheduler {
            inner: Rc::new(SchedulerInner {
                pending: Cell::new(None),
                inert: Cell::new(false),
                on_flush: RefCell::new(None),
            }),
        }
    }

    /// Install the flush body. Replaces any previous one.
    pub fn install(&self, flush: impl Fn() + 'static) {
        *self.inner.on_flush.borrow_mut() = Some(Rc::new(flush));
    }

    /// Request a flush at the next frame boundary. Idempotent: a no-op
    /// while one is already pending or after the scheduler went inert.
    pub fn request_flush(&self) {
        if self.inner.inert.get() || self.inner.pending.get().is_some() {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let handle = frame::request_frame(move || {
            let Some(inner) = weak.upgrade() else { return };
            // Clear the token before running the body: a mutation made
            // during (or after a failed) render must be able to schedule
            // a fresh flush.
            inner.pending.set(None);
            if inner.inert.get() {
                return;
            }
            let hook = inner.on_flush.borrow().clone();
            if let Some(hook) = hook {
                hook();
            }
        });
        tracing::trace!(?handle, "flush scheduled");
        self.inner.pending.set(Some(handle));
    }

    pub fn has_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }

    /// Cancel any outstanding frame callback.
    pub fn cancel(&self) {
        if let Some(handle) = self.inner.pending.take() {
            frame::cancel_frame(handle);
        }
    }

    /// Cancel and refuse all further scheduling.
    pub fn mark_inert(&self) {
        self.cancel();
        self.inner.inert.set(true);
        *self.inner.on_flush.borrow_mut() = None;
    }

    pub fn is_inert(&self) -> bool {
        self.inner.inert.get()
    }

    /// Run one flush synchronously. Cancels the pending token first, so
    /// the frame-driven path and the direct path cannot double-render.
    pub fn flush(&self, host: &dyn FlushHost) -> Result<FlushOutcome, RenderError> {
        self.cancel();
        if self.inner.inert.get() {
            return Ok(FlushOutcome::Skipped);
        }
        if !host.is_connected() {
            // Detached: leave the change set for the attach transition.
            tracing::trace!("flush skipped while detached");
            return Ok(FlushOutcome::Skipped);
        }

        let changes = host.take_changes();
        if changes.is_empty() {
            return Ok(FlushOutcome::Skipped);
        }
        let keys = changes.top_level_keys();

        // Should-render policy
        if let Some(props) = host.render_props() {
            if !keys.iter().any(|key| props.contains(key)) {
                tracing::trace!(?keys, "flush gated by render props");
                return Ok(FlushOutcome::Gated);
            }
        }

        // Dispatch policy
        if let Some(mapped) = host.render_map_keys() {
            if !mapped.is_empty() && keys.iter().all(|key| mapped.contains(key)) {
                tracing::trace!(?keys, "partial render");
                for key in &keys {
                    host.render_partial(key)?;
                }
                host.refresh_refs();
                return Ok(FlushOutcome::Partial(keys.len()));
            }
        }

        tracing::trace!(?keys, "full render");
        host.render_full()?;
        host.refresh_refs();
        Ok(FlushOutcome::Full)
    }
}

impl Default for RenderScheduler {
    fn default() -> Self {
        RenderScheduler::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
