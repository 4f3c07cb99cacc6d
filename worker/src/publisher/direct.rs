use std::sync::Arc;

use parameter_server::{ParameterLayout, Snapshot, StoreHandle, optimization::Optimizer};

use super::GradientPublisher;
use crate::{GradientUpdate, Result};

/// Applies gradients straight into a shared store, serialized on the store's write lock.
pub struct DirectPublisher<O: Optimizer> {
    handle: StoreHandle<O>,
}

impl<O: Optimizer> Clone for DirectPublisher<O> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

impl<O: Optimizer> DirectPublisher<O> {
    pub fn new(handle: StoreHandle<O>) -> Self {
        Self { handle }
    }
}

impl<O: Optimizer + Send + 'static> GradientPublisher for DirectPublisher<O> {
    fn layout(&self) -> &Arc<ParameterLayout> {
        self.handle.layout()
    }

    fn fetch(&self) -> Arc<Snapshot> {
        self.handle.snapshot()
    }

    fn fetch_target(&self) -> Option<Arc<Snapshot>> {
        None
    }

    async fn publish(&self, update: GradientUpdate) -> Result<u64> {
        let snapshot = self.handle.apply_gradient(&update.grads).await?;
        Ok(snapshot.version())
    }
}
