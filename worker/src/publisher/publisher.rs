use std::sync::Arc;

use parameter_server::{ParameterLayout, Snapshot};

use crate::{GradientUpdate, Result};

/// The protocol a worker uses to read the shared parameters and merge its gradients back.
///
/// Every implementation guarantees that at most one optimizer step is in progress at any time
/// and that `publish` only returns once the step has been applied.
#[allow(unused)]
#[trait_variant::make(GradientPublisher: Send)]
pub trait LocalGradientPublisher: Clone {
    /// The layout of the shared parameters.
    fn layout(&self) -> &Arc<ParameterLayout>;

    /// Returns the latest snapshot of the online parameters.
    fn fetch(&self) -> Arc<Snapshot>;

    /// Returns the latest snapshot of the target parameters, if this protocol keeps them.
    fn fetch_target(&self) -> Option<Arc<Snapshot>>;

    /// Merges a gradient into the shared parameters.
    ///
    /// # Arguments
    /// * `update` - The gradient to apply along with its provenance.
    ///
    /// # Returns
    /// The store step right after applying `update`.
    async fn publish(&self, update: GradientUpdate) -> Result<u64>;
}
