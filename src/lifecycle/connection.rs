//! Connection state machine.
//!
//! Tracks whether the augmented element is part of the live document and
//! gates the first render. Transitions are driven by the document
//! observer (never by application code calling in directly) and are
//! idempotent against the duplicate signals a coalesced observer can
//! produce.

use std::cell::Cell;

use bitflags::bitflags;

bitflags! {
    /// Lifecycle state bits owned by the connection machine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LifecycleFlags: u8 {
        /// Currently part of the live document tree.
        const ATTACHED = 1 << 0;
        /// Torn down; every further signal is a no-op.
        const INERT = 1 << 1;
        /// Render once on the first attach.
        const RENDER_ON_CREATE = 1 << 2;
        /// The one initial render has happened.
        const RENDERED_INITIALLY = 1 << 3;
    }
}

/// Whether the element is part of the live document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Detached,
    Attached,
}

// =============================================================================
// CONNECTION HOST
// =============================================================================

/// Entry/exit actions the machine drives on the component shell.
pub trait ConnectionHost {
    /// User-facing connect hook.
    fn connect_hook(&self);

    /// User-facing disconnect hook.
    fn disconnect_hook(&self);

    /// Perform the one initial full render (render-on-create path).
    fn initial_render(&self);

    /// Attached without an initial render: re-schedule a flush if changes
    /// accumulated while detached.
    fn resume_renders(&self);

    /// Release everything: pending frame, observation, listeners.
    fn teardown(&self);
}

// =============================================================================
// CONNECTION MACHINE
// =============================================================================

/// Per-component connect/disconnect state machine.
pub struct ConnectionMachine {
    flags: Cell<LifecycleFlags>,
}

impl ConnectionMachine {
    pub fn new(render_on_create: bool) -> Self {
        let mut flags = LifecycleFlags::empty();
        if render_on_create {
            flags |= LifecycleFlags::RENDER_ON_CREATE;
        }
        ConnectionMachine {
            flags: Cell::new(flags),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        if self.flags.get().contains(LifecycleFlags::ATTACHED) {
            ConnectionStatus::Attached
        } else {
            ConnectionStatus::Detached
        }
    }

    pub fn is_attached(&self) -> bool {
        self.flags.get().contains(LifecycleFlags::ATTACHED)
    }

    pub fn is_inert(&self) -> bool {
        self.flags.get().contains(LifecycleFlags::INERT)
    }

    pub fn has_rendered(&self) -> bool {
        self.flags.get().contains(LifecycleFlags::RENDERED_INITIALLY)
    }

    fn set(&self, flag: LifecycleFlags, on: bool) {
        let mut flags = self.flags.get();
        flags.set(flag, on);
        self.flags.set(flags);
    }

    /// The element is now part of the live document. Re-entering while
    /// already attached (or after teardown) is a no-op.
    pub fn signal_attached(&self, host: &dyn ConnectionHost) {
        let flags = self.flags.get();
        if flags.contains(LifecycleFlags::INERT) || flags.contains(LifecycleFlags::ATTACHED) {
            return;
        }
        tracing::debug!("connected");
        self.set(LifecycleFlags::ATTACHED, true);
        host.connect_hook();

        let flags = self.flags.get();
        if flags.contains(LifecycleFlags::RENDER_ON_CREATE)
            && !flags.contains(LifecycleFlags::RENDERED_INITIALLY)
        {
            // At most once per lifetime, even if the render panics.
            self.set(LifecycleFlags::RENDERED_INITIALLY, true);
            host.initial_render();
        } else {
            host.resume_renders();
        }
    }

    /// The element left the live document. Fires the disconnect hook and
    /// then unconditionally tears the component down. Duplicate signals
    /// and signals after teardown are no-ops.
    pub fn signal_detached(&self, host: &dyn ConnectionHost) {
        let flags = self.flags.get();
        if flags.contains(LifecycleFlags::INERT) || !flags.contains(LifecycleFlags::ATTACHED) {
            return;
        }
        tracing::debug!("disconnected");
        self.set(LifecycleFlags::ATTACHED, false);
        host.disconnect_hook();
        // Inert before teardown: anything re-entering from teardown's own
        // callbacks sees a dead machine.
        self.set(LifecycleFlags::INERT, true);
        host.teardown();
    }

    /// Explicit teardown (no disconnect hook). Idempotent.
    pub fn destroy(&self, host: &dyn ConnectionHost) {
        if self.flags.get().contains(LifecycleFlags::INERT) {
            return;
        }
        tracing::debug!("destroyed");
        self.set(LifecycleFlags::ATTACHED, false);
        self.set(LifecycleFlags::INERT, true);
        host.teardown();
    }
}

// =============================================================================
// TESTS
// =============================================================================
