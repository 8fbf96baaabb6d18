//! Scoped observations.
//!
//! An observation pairs a store listener with a delivery gate. Every event
//! is delivered while holding the gate and only if the gate is still open;
//! closing the gate takes the same lock. Once an observation is closed no
//! handler call for it can start, and any call already running on another
//! thread has finished. The gate is re-entrant so a handler may cancel its
//! own observation.

use canopy_store::{ListenerId, TreeStore};
use parking_lot::ReentrantMutex;
use std::cell::Cell;
use std::sync::Arc;
use tracing::debug;

/// Shared open/closed flag guarding event delivery.
#[derive(Clone)]
pub(crate) struct Gate(Arc<ReentrantMutex<Cell<bool>>>);

impl Gate {
    pub(crate) fn open() -> Self {
        Self(Arc::new(ReentrantMutex::new(Cell::new(true))))
    }

    /// Runs `deliver` if the gate is open, holding the gate meanwhile.
    pub(crate) fn pass(&self, deliver: impl FnOnce()) {
        let open = self.0.lock();
        if open.get() {
            deliver();
        }
    }

    pub(crate) fn close(&self) {
        self.0.lock().set(false);
    }

    pub(crate) fn same(&self, other: &Gate) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Detaches a store listener when dropped.
pub struct ListenerGuard {
    store: Arc<dyn TreeStore>,
    id: ListenerId,
}

impl ListenerGuard {
    pub fn new(store: Arc<dyn TreeStore>, id: ListenerId) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        debug!(id = %self.id, backend = self.store.backend_name(), "detaching listener");
        self.store.unlisten(self.id);
    }
}

/// One live observation of a provider.
///
/// The listener is attached after the store has replayed the current
/// children, so `guard` is briefly empty.
pub(crate) struct Observation {
    pub(crate) gate: Gate,
    pub(crate) guard: Option<ListenerGuard>,
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.gate.close();
    }
}
