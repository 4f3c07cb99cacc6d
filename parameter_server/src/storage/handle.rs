use std::{ops::Deref, sync::Arc};

use tokio::task;

use super::{ParameterStore, Result, Snapshot};
use crate::{optimization::Optimizer, parameters::ParameterSet};

/// The async interface to a shared `ParameterStore`.
///
/// It bridges the async runtime with the blocking, CPU-bound gradient application.
pub struct StoreHandle<O: Optimizer>(ParameterStore<O>);

impl<O: Optimizer> Clone for StoreHandle<O> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<O: Optimizer> Deref for StoreHandle<O> {
    type Target = ParameterStore<O>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<O: Optimizer> StoreHandle<O> {
    /// Creates a new `StoreHandle`.
    ///
    /// # Arguments
    /// * `store` - The underlying parameter store.
    ///
    /// # Returns
    /// A new `StoreHandle` instance.
    pub fn new(store: ParameterStore<O>) -> Self {
        Self(store)
    }
}

impl<O: Optimizer + Send> StoreHandle<O> {
    /// Async call to the synchronous implementation of `ParameterStore::apply_gradient`.
    ///
    /// Must run inside a multi-threaded tokio runtime.
    ///
    /// # Arguments
    /// * `grads` - A gradient with the store's layout.
    ///
    /// # Returns
    /// The new snapshot or a `ShapeMismatchErr`.
    pub async fn apply_gradient(&self, grads: &ParameterSet) -> Result<Arc<Snapshot>> {
        task::block_in_place(|| self.0.apply_gradient(grads))
    }
}
