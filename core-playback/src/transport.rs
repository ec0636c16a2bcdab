//! The replaceable playback-connection handle.
//!
//! There is at most one live transport connection per session. It is held as
//! an explicitly-owned, swappable reference rather than ambient global state:
//! the choreographer installs a handle when a connection confirms and clears
//! it on teardown, while the readiness gate and the reconciliation loop only
//! ever borrow the current value.

use bridge_traits::playback::TransportControls;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Shared slot for the current transport connection, if any.
#[derive(Default)]
pub struct TransportSlot {
    inner: Mutex<Option<Arc<dyn TransportControls>>>,
}

impl TransportSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh connection handle, replacing any previous one.
    pub fn install(&self, controls: Arc<dyn TransportControls>) {
        *self.inner.lock() = Some(controls);
    }

    /// Drop the current handle.
    pub fn clear(&self) {
        *self.inner.lock() = None;
    }

    /// The current handle, when a connection is live.
    pub fn get(&self) -> Option<Arc<dyn TransportControls>> {
        self.inner.lock().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().is_some()
    }
}

impl fmt::Debug for TransportSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSlot")
            .field("is_connected", &self.is_connected())
            .finish()
    }
}
