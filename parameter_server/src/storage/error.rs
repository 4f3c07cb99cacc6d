use std::{
    error::Error,
    fmt::{self, Display},
};

/// The specific result type for shape checks inside the storage module.
pub type Result<T> = std::result::Result<T, ShapeMismatchErr>;

/// Error returned whenever two parameter sets, a gradient and the store, or a raw buffer and a
/// tensor don't agree on their shape.
///
/// Shape mismatches are configuration errors, nothing in this crate truncates or pads tensors
/// to make them fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeMismatchErr {
    /// The amount of tensors differs.
    Layout { expected: usize, got: usize },
    /// A tensor has a different name or shape than expected.
    Tensor {
        name: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// A flat buffer doesn't hold the expected amount of values.
    Length { expected: usize, got: usize },
}

impl Display for ShapeMismatchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout { expected, got } => {
                write!(f, "layout mismatch: expected {expected} tensors, got {got}")
            }
            Self::Tensor {
                name,
                expected,
                got,
            } => write!(
                f,
                "tensor `{name}` shape mismatch: expected {expected:?}, got {got:?}"
            ),
            Self::Length { expected, got } => {
                write!(f, "buffer length mismatch: expected {expected}, got {got}")
            }
        }
    }
}

impl Error for ShapeMismatchErr {}
