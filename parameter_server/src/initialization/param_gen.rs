use crate::parameters::TensorSpec;

/// A `ParamGen` generates the initial values of the model's tensors.
pub trait ParamGen {
    /// Should generate the initial values of a single tensor.
    ///
    /// # Arguments
    /// * `spec` - The name and shape of the tensor being initialized.
    ///
    /// # Returns
    /// The values of the tensor in row-major order, the caller checks the length.
    fn generate(&mut self, spec: &TensorSpec) -> Vec<f32>;
}

impl<P: ParamGen + ?Sized> ParamGen for Box<P> {
    fn generate(&mut self, spec: &TensorSpec) -> Vec<f32> {
        (**self).generate(spec)
    }
}
