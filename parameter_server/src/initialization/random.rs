use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use super::{ParamGen, Result};
use crate::parameters::TensorSpec;

/// A parameter generator that samples every value from a fixed distribution.
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: R,
    distribution: D,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator, seeded by the caller for reproducible runs.
    /// * `distribution` - The distribution to sample from.
    ///
    /// # Returns
    /// A new `RandParamGen` instance.
    pub fn new(rng: R, distribution: D) -> Self {
        Self { rng, distribution }
    }
}

impl<R: Rng> RandParamGen<R, Uniform<f32>> {
    /// Creates a new `RandParamGen` with a uniform distribution over `[low, high)`.
    ///
    /// # Returns
    /// An error if the range is empty or not finite.
    pub fn uniform(rng: R, low: f32, high: f32) -> Result<Self> {
        Ok(Self::new(rng, Uniform::new(low, high)?))
    }
}

impl<R: Rng> RandParamGen<R, Normal<f32>> {
    /// Creates a new `RandParamGen` with a normal distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is negative or not finite.
    pub fn normal(rng: R, mean: f32, std_dev: f32) -> Result<Self> {
        Ok(Self::new(rng, Normal::new(mean, std_dev)?))
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn generate(&mut self, spec: &TensorSpec) -> Vec<f32> {
        (&self.distribution)
            .sample_iter(&mut self.rng)
            .take(spec.numel())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn uniform_stays_in_range() {
        let rng = StdRng::seed_from_u64(42);
        let mut param_gen = RandParamGen::uniform(rng, -0.5, 0.5).unwrap();

        let values = param_gen.generate(&TensorSpec::new("w", [4, 8]));
        assert_eq!(values.len(), 32);
        assert!(values.iter().all(|v| (-0.5..0.5).contains(v)));
    }

    #[test]
    fn same_seed_same_values() {
        let spec = TensorSpec::new("w", [16]);
        let mut a = RandParamGen::normal(StdRng::seed_from_u64(7), 0., 1.).unwrap();
        let mut b = RandParamGen::normal(StdRng::seed_from_u64(7), 0., 1.).unwrap();
        assert_eq!(a.generate(&spec), b.generate(&spec));
    }

    #[test]
    fn invalid_distributions_are_rejected() {
        assert!(RandParamGen::uniform(StdRng::seed_from_u64(0), 1., -1.).is_err());
        assert!(RandParamGen::normal(StdRng::seed_from_u64(0), 0., f32::NAN).is_err());
    }
}
