use crate::storage::{Result, ShapeMismatchErr};

/// A dense, row-major `f32` tensor backed by a flat buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Box<[f32]>,
}

impl Tensor {
    /// Creates a new zero filled `Tensor`.
    ///
    /// # Arguments
    /// * `shape` - The dimensions of the tensor.
    ///
    /// # Returns
    /// A new `Tensor` instance.
    pub fn zeros(shape: &[usize]) -> Self {
        let len = shape.iter().product();

        Self {
            shape: shape.to_vec(),
            data: vec![0.; len].into_boxed_slice(),
        }
    }

    /// Creates a new `Tensor` from a flat buffer.
    ///
    /// # Arguments
    /// * `shape` - The dimensions of the tensor.
    /// * `data` - The values in row-major order.
    ///
    /// # Returns
    /// A `ShapeMismatchErr` if `data` doesn't hold exactly as many values as `shape` needs.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();

        if expected != data.len() {
            return Err(ShapeMismatchErr::Length {
                expected,
                got: data.len(),
            });
        }

        Ok(Self {
            shape: shape.to_vec(),
            data: data.into_boxed_slice(),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Whether every value is neither NaN nor infinite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Overwrites this tensor's values with the ones in `other`.
    ///
    /// # Arguments
    /// * `other` - The source tensor, it must have the same shape.
    ///
    /// # Returns
    /// A `ShapeMismatchErr::Length` if the tensors differ in size.
    pub fn copy_from(&mut self, other: &Tensor) -> Result<()> {
        if self.data.len() != other.data.len() {
            return Err(ShapeMismatchErr::Length {
                expected: self.data.len(),
                got: other.data.len(),
            });
        }

        self.data.copy_from_slice(&other.data);
        Ok(())
    }
}
