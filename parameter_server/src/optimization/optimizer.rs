use crate::{
    parameters::Tensor,
    storage::{Result, ShapeMismatchErr},
};

/// Defines the rule used to move a tensor along its gradient.
///
/// One optimizer instance is bound to one tensor of the store, so any accumulated state
/// (moments, velocities, step counters) is sized for that tensor only.
pub trait Optimizer {
    /// Applies a single optimization step.
    ///
    /// # Arguments
    /// * `grad` - The gradient of the loss with respect to `param`.
    /// * `param` - The tensor to update in place.
    ///
    /// # Returns
    /// A `ShapeMismatchErr` if `grad` and `param` differ in size.
    fn step(&mut self, grad: &Tensor, param: &mut Tensor) -> Result<()>;
}

/// Fails unless both tensors hold the same amount of values.
pub(super) fn check_len(grad: &Tensor, param: &Tensor) -> Result<()> {
    if grad.len() != param.len() {
        return Err(ShapeMismatchErr::Length {
            expected: param.len(),
            got: grad.len(),
        });
    }

    Ok(())
}
