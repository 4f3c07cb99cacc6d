use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;
use rayon::prelude::*;

use super::{Result, Snapshot, SnapshotCell};
use crate::{
    initialization::ParamGen,
    optimization::Optimizer,
    parameters::{ParameterLayout, ParameterSet, TensorSpec},
};

/// The mutable half of the store, only ever touched while holding the write lock.
#[derive(Debug)]
struct StoreState<O: Optimizer> {
    step: u64,
    params: ParameterSet,
    optimizers: Vec<O>,
}

/// The canonical, shared parameters of a training session along with their optimizer state.
///
/// Gradients are applied one at a time behind a single write lock, every successful
/// application publishes a new `Snapshot` that readers can grab without waiting for writers.
/// Cloning the store is cheap, every clone refers to the same parameters.
#[derive(Debug)]
pub struct ParameterStore<O: Optimizer> {
    layout: Arc<ParameterLayout>,
    published: Arc<SnapshotCell>,
    state: Arc<Mutex<StoreState<O>>>,
}

impl<O: Optimizer> Clone for ParameterStore<O> {
    fn clone(&self) -> Self {
        Self {
            layout: Arc::clone(&self.layout),
            published: Arc::clone(&self.published),
            state: Arc::clone(&self.state),
        }
    }
}

impl<O: Optimizer> ParameterStore<O> {
    /// Creates a new `ParameterStore` with freshly generated parameters.
    ///
    /// # Arguments
    /// * `layout` - The tensors of the model.
    /// * `param_gen` - The parameter generator for the initial values.
    /// * `optimizer_factory` - Builds the optimizer of every tensor.
    ///
    /// # Returns
    /// A `ShapeMismatchErr` if `param_gen` doesn't generate exactly one value per parameter.
    pub fn new<PG, OF>(
        layout: Arc<ParameterLayout>,
        mut param_gen: PG,
        optimizer_factory: OF,
    ) -> Result<Self>
    where
        PG: ParamGen,
        OF: FnMut(&TensorSpec) -> O,
    {
        let buffers = layout.iter().map(|spec| param_gen.generate(spec)).collect();
        let params = ParameterSet::from_buffers(Arc::clone(&layout), buffers)?;
        Ok(Self::from_params(params, 0, optimizer_factory))
    }

    /// Creates a new `ParameterStore` from already existing parameters, e.g. a checkpoint.
    ///
    /// # Arguments
    /// * `params` - The initial parameters.
    /// * `step` - The amount of gradients already applied to `params`.
    /// * `optimizer_factory` - Builds the optimizer of every tensor.
    ///
    /// # Returns
    /// A new `ParameterStore` instance.
    pub fn from_params<OF>(params: ParameterSet, step: u64, optimizer_factory: OF) -> Self
    where
        OF: FnMut(&TensorSpec) -> O,
    {
        let layout = Arc::clone(params.layout());
        let optimizers = layout.iter().map(optimizer_factory).collect();
        let published = SnapshotCell::new(Snapshot::new(step, params.clone()));

        let state = StoreState {
            step,
            params,
            optimizers,
        };

        Self {
            layout,
            published: Arc::new(published),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn layout(&self) -> &Arc<ParameterLayout> {
        &self.layout
    }

    /// Returns the amount of gradients applied so far.
    pub fn step(&self) -> u64 {
        self.published.load().version()
    }

    /// Returns the cell where this store publishes its snapshots.
    pub(crate) fn cell(&self) -> &Arc<SnapshotCell> {
        &self.published
    }

    /// Returns the latest published snapshot of the parameters.
    ///
    /// Never waits for an in flight `apply_gradient`.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.published.load()
    }
}

impl<O: Optimizer + Send> ParameterStore<O> {
    /// Applies one optimizer step with the given gradient.
    ///
    /// Gradients computed against any past version are accepted, callers are serialized on
    /// the store's write lock and the tensors are updated in parallel while holding it.
    ///
    /// # Arguments
    /// * `grads` - A gradient with exactly the store's layout.
    ///
    /// # Returns
    /// The newly published snapshot, or a `ShapeMismatchErr` if `grads` doesn't match the
    /// layout, in which case nothing is modified.
    pub fn apply_gradient(&self, grads: &ParameterSet) -> Result<Arc<Snapshot>> {
        let mut state = self.state.lock();
        state.params.check_shape(grads)?;

        let StoreState {
            step,
            params,
            optimizers,
        } = &mut *state;

        params
            .tensors_mut()
            .par_iter_mut()
            .zip(optimizers.par_iter_mut())
            .zip(grads.tensors().par_iter())
            .try_for_each(|((param, optimizer), grad)| optimizer.step(grad, param))?;

        *step += 1;
        let snapshot = Arc::new(Snapshot::new(*step, params.clone()));
        self.published.publish(Arc::clone(&snapshot));

        trace!(step = *step; "applied gradient");
        Ok(snapshot)
    }
}
