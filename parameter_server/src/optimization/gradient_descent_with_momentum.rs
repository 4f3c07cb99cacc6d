use super::{Optimizer, optimizer::check_len};
use crate::{parameters::Tensor, storage::Result};

/// Gradient descent with a heavy-ball momentum term.
///
/// `v <- mu * v + g`, `p <- p - lr * v`.
#[derive(Debug, Clone)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    velocity: Box<[f32]>,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` optimizer.
    ///
    /// # Arguments
    /// * `len` - The size of the tensor this instance updates.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - How much of the previous velocity survives each step.
    ///
    /// # Returns
    /// A new `GradientDescentWithMomentum` instance.
    pub fn new(len: usize, learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn step(&mut self, grad: &Tensor, param: &mut Tensor) -> Result<()> {
        check_len(grad, param)?;

        let (lr, mu) = (self.learning_rate, self.momentum);
        let updates = param.data_mut().iter_mut().zip(grad.data());

        for ((p, g), v) in updates.zip(self.velocity.iter_mut()) {
            *v = mu * *v + g;
            *p -= lr * *v;
        }

        Ok(())
    }
}
