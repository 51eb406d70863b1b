//! Shared lifecycle state of one client instance.

use netrelay_domain::ClientLifecycleState;
use parking_lot::{RwLock, RwLockReadGuard};

/// Lifecycle state behind a read/write lock.
///
/// Submitters and deliverers hold the read guard across their decision; a
/// transition takes the write lock, so once it returns no reader is still
/// acting on the old state.
#[derive(Debug)]
pub struct Lifecycle {
    state: RwLock<ClientLifecycleState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Starts `Active`.
    pub fn new() -> Self {
        Self { state: RwLock::new(ClientLifecycleState::Active) }
    }

    /// Hold the state steady; `transition` blocks until the guard drops.
    pub fn read(&self) -> RwLockReadGuard<'_, ClientLifecycleState> {
        self.state.read()
    }

    /// Snapshot of the state.
    pub fn current(&self) -> ClientLifecycleState {
        *self.state.read()
    }

    /// Move from `from` to `to`. Returns `false` (and changes nothing) if the
    /// current state is not `from` or the transition is not allowed.
    pub fn transition(&self, from: ClientLifecycleState, to: ClientLifecycleState) -> bool {
        let mut state = self.state.write();
        if *state != from || !from.can_transition_to(to) {
            return false;
        }
        *state = to;
        true
    }
}
