use super::ParamGen;
use crate::parameters::TensorSpec;

/// A parameter generator that fills every tensor with the same value.
#[derive(Debug, Clone, Copy)]
pub struct ConstParamGen {
    value: f32,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `value` - The value to always generate.
    ///
    /// # Returns
    /// A new `ConstParamGen` instance.
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl ParamGen for ConstParamGen {
    fn generate(&mut self, spec: &TensorSpec) -> Vec<f32> {
        vec![self.value; spec.numel()]
    }
}
