//! Host runtime that entities attach to
//!
//! Owns the entity state machine (with change notification), the wall clock
//! and the store used to bring entity states back after a restart.

pub mod clock;
pub mod restore;
pub mod state;

use std::sync::Arc;

pub use clock::{Clock, FixedClock, SystemClock};
pub use restore::{JsonRestoreStore, RestoreStateStore};
pub use state::{EntityState, ListenerId, StateChangeListener, StateChangedEvent, StateStore};

#[derive(Clone)]
pub struct Host {
    pub states: Arc<StateStore>,
    pub restore: Arc<dyn RestoreStateStore>,
    pub clock: Arc<dyn Clock>,
}

impl Host {
    pub fn new(restore: Arc<dyn RestoreStateStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            states: Arc::new(StateStore::new()),
            restore,
            clock,
        }
    }

    /// Host with an in-memory restore store and the system clock
    pub fn ephemeral() -> Self {
        Self::new(Arc::new(JsonRestoreStore::in_memory()), Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("states", &self.states)
            .finish_non_exhaustive()
    }
}
