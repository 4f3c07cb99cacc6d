use std::sync::Arc;

use super::{ParameterLayout, Tensor};
use crate::storage::{Result, ShapeMismatchErr};

/// A named collection of tensors following a `ParameterLayout`.
///
/// Used for the canonical weights, the worker replicas, the target copy and gradients alike.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    layout: Arc<ParameterLayout>,
    tensors: Vec<Tensor>,
}

impl ParameterSet {
    /// Creates a new zero filled `ParameterSet`.
    ///
    /// # Arguments
    /// * `layout` - The layout of the tensors to allocate.
    ///
    /// # Returns
    /// A new `ParameterSet` instance.
    pub fn zeros(layout: Arc<ParameterLayout>) -> Self {
        let tensors = layout.iter().map(|spec| Tensor::zeros(spec.shape())).collect();
        Self { layout, tensors }
    }

    /// Creates a new `ParameterSet` from flat buffers, one per tensor in the layout.
    ///
    /// # Arguments
    /// * `layout` - The layout describing the buffers.
    /// * `buffers` - One row-major buffer per tensor, in layout order.
    ///
    /// # Returns
    /// A `ShapeMismatchErr` if the amount of buffers or any of their lengths is wrong.
    pub fn from_buffers(layout: Arc<ParameterLayout>, buffers: Vec<Vec<f32>>) -> Result<Self> {
        if layout.len() != buffers.len() {
            return Err(ShapeMismatchErr::Layout {
                expected: layout.len(),
                got: buffers.len(),
            });
        }

        let tensors = layout
            .iter()
            .zip(buffers)
            .map(|(spec, data)| Tensor::from_vec(spec.shape(), data))
            .collect::<Result<_>>()?;

        Ok(Self { layout, tensors })
    }

    pub fn layout(&self) -> &Arc<ParameterLayout> {
        &self.layout
    }

    pub fn tensors(&self) -> &[Tensor] {
        &self.tensors
    }

    pub fn tensors_mut(&mut self) -> &mut [Tensor] {
        &mut self.tensors
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.layout.position(name).map(|i| &self.tensors[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tensor> {
        self.layout.position(name).map(|i| &mut self.tensors[i])
    }

    /// Iterates the tensors along with their names, in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.layout
            .iter()
            .zip(&self.tensors)
            .map(|(spec, tensor)| (spec.name(), tensor))
    }

    /// Returns the total amount of scalar values.
    pub fn numel(&self) -> usize {
        self.tensors.iter().map(Tensor::len).sum()
    }

    pub fn fill(&mut self, value: f32) {
        self.tensors.iter_mut().for_each(|t| t.fill(value));
    }

    /// Whether every value of every tensor is finite.
    pub fn is_finite(&self) -> bool {
        self.tensors.iter().all(Tensor::is_finite)
    }

    /// Checks that `other` has exactly the same layout as `self`.
    ///
    /// # Arguments
    /// * `other` - The set to compare against.
    ///
    /// # Returns
    /// A `ShapeMismatchErr` describing the first difference.
    pub fn check_shape(&self, other: &ParameterSet) -> Result<()> {
        if Arc::ptr_eq(&self.layout, &other.layout) {
            return Ok(());
        }

        self.layout.check(&other.layout)
    }

    /// Overwrites every tensor with the values in `other` without reallocating.
    ///
    /// # Arguments
    /// * `other` - The source set, it must share this set's layout.
    ///
    /// # Returns
    /// A `ShapeMismatchErr` if the layouts differ, in which case nothing is copied.
    pub fn copy_from(&mut self, other: &ParameterSet) -> Result<()> {
        self.check_shape(other)?;

        for (dst, src) in self.tensors.iter_mut().zip(&other.tensors) {
            dst.copy_from(src)?;
        }

        Ok(())
    }
}
