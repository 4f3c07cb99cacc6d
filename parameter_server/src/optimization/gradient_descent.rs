use super::{Optimizer, optimizer::check_len};
use crate::{parameters::Tensor, storage::Result};

/// Plain stochastic gradient descent, `p <- p - lr * g`.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    ///
    /// # Returns
    /// A new `GradientDescent` instance.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    fn step(&mut self, grad: &Tensor, param: &mut Tensor) -> Result<()> {
        check_len(grad, param)?;

        let lr = self.learning_rate;
        param
            .data_mut()
            .iter_mut()
            .zip(grad.data())
            .for_each(|(p, g)| *p -= lr * g);

        Ok(())
    }
}
