mod layout;
mod set;
mod tensor;

pub use layout::{ParameterLayout, TensorSpec};
pub use set::ParameterSet;
pub use tensor::Tensor;
