use std::sync::Arc;

use parking_lot::RwLock;

use crate::parameters::ParameterSet;

/// An immutable, fully written copy of the parameters at a given store step.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    version: u64,
    params: ParameterSet,
}

impl Snapshot {
    /// Creates a new `Snapshot`.
    ///
    /// # Arguments
    /// * `version` - The amount of gradients applied before taking this snapshot.
    /// * `params` - The parameters at that step.
    ///
    /// # Returns
    /// A new `Snapshot` instance.
    pub fn new(version: u64, params: ParameterSet) -> Self {
        Self { version, params }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }
}

/// Holds the latest published `Snapshot`.
///
/// Writers swap the whole `Arc` at once, so readers either see the previous snapshot or the
/// new one, never a mix of both. The read lock is only held for the `Arc` clone.
#[derive(Debug)]
pub struct SnapshotCell {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotCell {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Returns the latest published snapshot.
    pub fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Replaces the published snapshot.
    pub fn publish(&self, snapshot: Arc<Snapshot>) {
        *self.current.write() = snapshot;
    }
}
