use std::sync::Arc;

use parameter_server::{ParameterLayout, ParameterSet, storage::Result};

use crate::Trajectory;

/// The result of a backward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Backward {
    pub loss: f32,
    pub grads: ParameterSet,
}

impl Backward {
    /// Whether both the loss and every gradient value are finite.
    pub fn is_finite(&self) -> bool {
        self.loss.is_finite() && self.grads.is_finite()
    }
}

/// The differentiable model a worker trains.
///
/// A model holds no parameters of its own, every call receives the parameter set to use, so
/// the same model can run against a replica and a target copy.
pub trait Model {
    /// The tensors the model expects, must match the store's layout.
    fn layout(&self) -> Arc<ParameterLayout>;

    /// Computes the action scores for a single state.
    ///
    /// # Returns
    /// A `ShapeMismatchErr` if `params` or `state` don't fit the model.
    fn forward(&self, params: &ParameterSet, state: &[f32]) -> Result<Vec<f32>>;

    /// Computes the loss over a trajectory and its gradient with respect to `params`.
    ///
    /// # Arguments
    /// * `trajectory` - The rollout to learn from.
    /// * `params` - The parameters the trajectory was collected with.
    /// * `target` - The lagged target parameters, when the training variant keeps them.
    /// * `gamma` - The discount factor.
    ///
    /// # Returns
    /// The loss and gradient, or a `ShapeMismatchErr` if the parameters don't fit the model.
    fn backward(
        &self,
        trajectory: &Trajectory,
        params: &ParameterSet,
        target: Option<&ParameterSet>,
        gamma: f32,
    ) -> Result<Backward>;
}
