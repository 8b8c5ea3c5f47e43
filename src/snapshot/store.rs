//! The current-snapshot slot.

use std::sync::Arc;

use parking_lot::RwLock;

use super::Snapshot;

/// Holds exactly one "current" snapshot reference. Replacement is atomic:
/// the write lock covers only the pointer swap, and readers clone the `Arc`
/// under the read lock and then proceed without coordination.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> SnapshotStore {
        SnapshotStore::default()
    }

    /// The current snapshot, if one has been published.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().clone()
    }

    /// Atomically replaces the current snapshot.
    pub fn publish(&self, snapshot: Arc<Snapshot>) {
        *self.current.write() = Some(snapshot);
    }
}
