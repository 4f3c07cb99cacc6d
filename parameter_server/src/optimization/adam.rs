use super::{Optimizer, optimizer::check_len};
use crate::{parameters::Tensor, storage::Result};

/// The Adam optimizer with bias corrected first and second moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    m: Box<[f32]>,
    v: Box<[f32]>,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The size of the tensor this instance updates.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2` - Decay rates of the first and second moment estimates.
    /// * `epsilon` - Added to the denominator for numerical stability.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: vec![0.; len].into_boxed_slice(),
            v: vec![0.; len].into_boxed_slice(),
        }
    }

    /// Returns the amount of steps taken so far.
    pub fn steps(&self) -> i32 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, grad: &Tensor, param: &mut Tensor) -> Result<()> {
        check_len(grad, param)?;

        self.t = self.t.saturating_add(1);

        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let m_hat_scale = 1. / (1. - b1.powi(self.t));
        let v_hat_scale = 1. / (1. - b2.powi(self.t));
        let lr = self.learning_rate;

        let moments = self.m.iter_mut().zip(self.v.iter_mut());
        for ((p, g), (m, v)) in param.data_mut().iter_mut().zip(grad.data()).zip(moments) {
            *m = b1 * *m + (1. - b1) * g;
            *v = b2 * *v + (1. - b2) * g * g;

            let m_hat = *m * m_hat_scale;
            let v_hat = *v * v_hat_scale;
            *p -= lr * m_hat / (v_hat.sqrt() + eps);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut opt = Adam::new(2, 0.1, 0.9, 0.999, 1e-8);
        let mut param = Tensor::zeros(&[2]);
        let grad = Tensor::from_vec(&[2], vec![4., -0.5]).unwrap();

        opt.step(&grad, &mut param).unwrap();

        // With bias correction the first step is lr * sign(g).
        assert!((param.data()[0] + 0.1).abs() < 1e-5);
        assert!((param.data()[1] - 0.1).abs() < 1e-5);
        assert_eq!(opt.steps(), 1);
    }
}
