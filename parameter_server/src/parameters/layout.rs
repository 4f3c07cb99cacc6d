use crate::storage::{Result, ShapeMismatchErr};

/// The name and shape of a single trainable tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorSpec {
    name: String,
    shape: Vec<usize>,
}

impl TensorSpec {
    /// Creates a new `TensorSpec`.
    ///
    /// # Arguments
    /// * `name` - The name of the tensor, unique inside a layout.
    /// * `shape` - The dimensions of the tensor.
    ///
    /// # Returns
    /// A new `TensorSpec` instance.
    pub fn new(name: impl Into<String>, shape: impl Into<Vec<usize>>) -> Self {
        Self {
            name: name.into(),
            shape: shape.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the amount of scalar values in the tensor.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// The ordered list of tensors that make up a model.
///
/// Every replica, gradient and the canonical store of a training session share the same
/// layout, comparing layouts is how shape mismatches are detected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParameterLayout {
    specs: Vec<TensorSpec>,
}

impl ParameterLayout {
    /// Creates a new `ParameterLayout`.
    ///
    /// # Arguments
    /// * `specs` - The tensors of the model, in order.
    ///
    /// # Returns
    /// A new `ParameterLayout` instance.
    pub fn new(specs: Vec<TensorSpec>) -> Self {
        Self { specs }
    }

    /// Appends a new tensor to the layout.
    ///
    /// # Arguments
    /// * `name` - The name of the tensor.
    /// * `shape` - The dimensions of the tensor.
    ///
    /// # Returns
    /// The extended layout.
    pub fn with(mut self, name: impl Into<String>, shape: impl Into<Vec<usize>>) -> Self {
        self.specs.push(TensorSpec::new(name, shape));
        self
    }

    /// Returns the amount of tensors in the layout.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Returns the total amount of scalar parameters.
    pub fn numel(&self) -> usize {
        self.specs.iter().map(TensorSpec::numel).sum()
    }

    pub fn specs(&self) -> &[TensorSpec] {
        &self.specs
    }

    pub fn iter(&self) -> impl Iterator<Item = &TensorSpec> {
        self.specs.iter()
    }

    /// Finds the index of a tensor given it's name.
    ///
    /// # Arguments
    /// * `name` - The name of the tensor.
    ///
    /// # Returns
    /// The position of the tensor in the layout, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.name == name)
    }

    /// Checks that `other` describes exactly the same tensors as `self`.
    ///
    /// # Arguments
    /// * `other` - The layout to compare against, `self` is the expected one.
    ///
    /// # Returns
    /// A `ShapeMismatchErr` describing the first difference found.
    pub fn check(&self, other: &ParameterLayout) -> Result<()> {
        if self.specs.len() != other.specs.len() {
            return Err(ShapeMismatchErr::Layout {
                expected: self.specs.len(),
                got: other.specs.len(),
            });
        }

        for (expected, got) in self.specs.iter().zip(&other.specs) {
            if expected != got {
                return Err(ShapeMismatchErr::Tensor {
                    name: expected.name.clone(),
                    expected: expected.shape.clone(),
                    got: got.shape.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ParameterLayout {
        ParameterLayout::default()
            .with("q.weight", [2, 3])
            .with("q.bias", [2])
    }

    #[test]
    fn numel_sums_every_tensor() {
        let layout = layout();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.numel(), 8);
        assert_eq!(layout.position("q.bias"), Some(1));
        assert_eq!(layout.position("missing"), None);
    }

    #[test]
    fn check_detects_shape_differences() {
        let other = ParameterLayout::default()
            .with("q.weight", [3, 2])
            .with("q.bias", [2]);

        let err = layout().check(&other).unwrap_err();
        assert_eq!(
            err,
            ShapeMismatchErr::Tensor {
                name: "q.weight".into(),
                expected: vec![2, 3],
                got: vec![3, 2],
            }
        );
    }

    #[test]
    fn check_detects_missing_tensors() {
        let other = ParameterLayout::default().with("q.weight", [2, 3]);
        let err = layout().check(&other).unwrap_err();
        assert_eq!(err, ShapeMismatchErr::Layout { expected: 2, got: 1 });
        assert!(layout().check(&layout()).is_ok());
    }
}
