use std::sync::Arc;

use parameter_server::{ParameterLayout, ParameterSet, Snapshot, storage::Result};

/// A worker's local copy of the parameters and the store step it was taken at.
#[derive(Debug, Clone)]
pub struct ModelReplica {
    params: ParameterSet,
    version: u64,
}

impl ModelReplica {
    /// Creates a new zeroed `ModelReplica`, it must be synced before use.
    pub fn new(layout: Arc<ParameterLayout>) -> Self {
        Self {
            params: ParameterSet::zeros(layout),
            version: 0,
        }
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// The store step of the last sync.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Overwrites the replica with a snapshot, reusing its buffers.
    ///
    /// # Returns
    /// A `ShapeMismatchErr` if the snapshot has a different layout, the replica is unchanged.
    pub fn sync(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.params.copy_from(snapshot.params())?;
        self.version = snapshot.version();
        Ok(())
    }

    /// The amount of updates the store has applied since the last sync.
    pub fn staleness(&self, current: u64) -> u64 {
        current.saturating_sub(self.version)
    }
}

#[cfg(test)]
mod tests {
    use parameter_server::ShapeMismatchErr;

    use super::*;

    #[test]
    fn sync_copies_params_and_version() {
        let layout = Arc::new(ParameterLayout::default().with("w", [3]));
        let mut params = ParameterSet::zeros(Arc::clone(&layout));
        params.fill(2.);

        let mut replica = ModelReplica::new(layout);
        replica.sync(&Snapshot::new(7, params.clone())).unwrap();

        assert_eq!(replica.params(), &params);
        assert_eq!(replica.version(), 7);
        assert_eq!(replica.staleness(10), 3);
    }

    #[test]
    fn sync_rejects_other_layouts() {
        let mut replica = ModelReplica::new(Arc::new(ParameterLayout::default().with("w", [3])));
        let other = ParameterSet::zeros(Arc::new(ParameterLayout::default().with("w", [4])));

        let err = replica.sync(&Snapshot::new(1, other)).unwrap_err();
        assert!(matches!(err, ShapeMismatchErr::Tensor { .. }));
        assert_eq!(replica.version(), 0);
    }
}
