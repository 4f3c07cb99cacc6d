use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use super::ParamGen;
use crate::parameters::TensorSpec;

/// The fan based initialization schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanScheme {
    XavierUniform,
    Xavier,
    Kaiming,
    LecunUniform,
    Lecun,
}

/// A parameter generator that scales its distribution with the fan in and fan out of each
/// tensor, read from the tensor's shape.
///
/// Tensors with two or more dimensions are treated as `[fan_out, fan_in, ...]`. One dimensional
/// tensors (biases) are initialized to zero.
pub struct FanParamGen<R: Rng> {
    rng: R,
    scheme: FanScheme,
}

impl<R: Rng> FanParamGen<R> {
    /// Creates a new `FanParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `scheme` - The initialization scheme to follow.
    ///
    /// # Returns
    /// A new `FanParamGen` instance.
    pub fn new(rng: R, scheme: FanScheme) -> Self {
        Self { rng, scheme }
    }

    /// Samples `n` values uniformly from `[-bound, bound)`.
    fn uniform(&mut self, bound: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|_| bound * (2. * self.rng.random::<f32>() - 1.))
            .collect()
    }

    /// Samples `n` values from a zero centered normal distribution.
    fn normal(&mut self, std_dev: f32, n: usize) -> Vec<f32> {
        StandardNormal
            .sample_iter(&mut self.rng)
            .take(n)
            .map(|v: f32| std_dev * v)
            .collect()
    }
}

impl<R: Rng> ParamGen for FanParamGen<R> {
    fn generate(&mut self, spec: &TensorSpec) -> Vec<f32> {
        let n = spec.numel();

        let (fan_out, fan_in) = match spec.shape() {
            [out, rest @ ..] if !rest.is_empty() => (*out, rest.iter().product::<usize>()),
            _ => return vec![0.; n],
        };

        // Fans are clamped to at least one so the scales stay finite.
        let (fan_in, fan_out) = (fan_in.max(1) as f32, fan_out.max(1) as f32);

        match self.scheme {
            FanScheme::XavierUniform => self.uniform((6. / (fan_in + fan_out)).sqrt(), n),
            FanScheme::LecunUniform => self.uniform((3. / fan_in).sqrt(), n),
            FanScheme::Xavier => self.normal((2. / (fan_in + fan_out)).sqrt(), n),
            FanScheme::Kaiming => self.normal((2. / fan_in).sqrt(), n),
            FanScheme::Lecun => self.normal((1. / fan_in).sqrt(), n),
        }
    }
}
