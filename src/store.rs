use crate::types::Snapshot;
use std::sync::{Arc, Mutex, MutexGuard};

/// Latest complete snapshot, shared between the polling thread and readers.
///
/// The polling thread is the only writer. Every `write` replaces the whole
/// state and every `read` copies it out under the same lock, so a reader
/// never observes two cycles mixed together.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    state: Mutex<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot with the result of a completed cycle.
    pub fn write(&self, snapshot: Snapshot) {
        *self.lock() = snapshot;
    }

    /// Owned deep copy of the current snapshot.
    pub fn read(&self) -> Snapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        // Writes are a single assignment, so a poisoned lock still holds a
        // complete snapshot.
        self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("Snapshot lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

/// Cloneable read-only handle to a tracker's snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    store: Arc<SnapshotStore>,
}

impl SnapshotReader {
    pub(crate) fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn read(&self) -> Snapshot {
        self.store.read()
    }
}
