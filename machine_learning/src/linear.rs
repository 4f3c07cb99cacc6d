use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, linalg};
use parameter_server::{ParameterLayout, ParameterSet, ShapeMismatchErr, storage::Result};

/// A fully connected layer without activation, `z = W x + b`.
///
/// The weight is stored as `[outputs, inputs]` and the bias as `[outputs]`, both looked up by
/// name in the parameter set so several layers can share one.
#[derive(Debug, Clone)]
pub struct Linear {
    weight: String,
    bias: String,
    inputs: usize,
    outputs: usize,
}

impl Linear {
    /// Creates a new `Linear` layer.
    ///
    /// # Arguments
    /// * `prefix` - The name prefix of the layer's tensors.
    /// * `inputs` - The size of the input vectors.
    /// * `outputs` - The size of the output vectors.
    ///
    /// # Returns
    /// A new `Linear` instance.
    pub fn new(prefix: &str, inputs: usize, outputs: usize) -> Self {
        Self {
            weight: format!("{prefix}.weight"),
            bias: format!("{prefix}.bias"),
            inputs,
            outputs,
        }
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// Appends this layer's tensors to a layout.
    pub fn extend(&self, layout: ParameterLayout) -> ParameterLayout {
        layout
            .with(self.weight.as_str(), [self.outputs, self.inputs])
            .with(self.bias.as_str(), [self.outputs])
    }

    /// Computes the outputs for a batch of inputs.
    ///
    /// # Arguments
    /// * `params` - The parameter set holding the layer's tensors.
    /// * `x` - The inputs, one row per sample.
    ///
    /// # Returns
    /// One row of outputs per sample.
    pub fn forward(&self, params: &ParameterSet, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.inputs {
            return Err(ShapeMismatchErr::Length {
                expected: self.inputs,
                got: x.ncols(),
            });
        }

        let (w, b) = self.view_params(params)?;
        let mut z = Array2::zeros((x.nrows(), self.outputs));
        linalg::general_mat_mul(1.0, &x, &w.t(), 0.0, &mut z);
        z += &b;
        Ok(z)
    }

    /// Accumulates the gradient of the layer's tensors.
    ///
    /// # Arguments
    /// * `grads` - The gradient set, with the same layout as the parameters.
    /// * `x` - The inputs of the forward pass.
    /// * `d` - The derivative of the loss with respect to the outputs.
    pub fn backward(
        &self,
        grads: &mut ParameterSet,
        x: ArrayView2<f32>,
        d: ArrayView2<f32>,
    ) -> Result<()> {
        let mut dw = self.view_mut(grads, &self.weight, (self.outputs, self.inputs))?;
        linalg::general_mat_mul(1.0, &d.t(), &x, 1.0, &mut dw);

        let mut db = self.view_mut_1d(grads, &self.bias)?;
        db += &d.sum_axis(Axis(0));
        Ok(())
    }

    fn view_params<'a>(
        &self,
        params: &'a ParameterSet,
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let w = lookup(params, &self.weight)?;
        let b = lookup(params, &self.bias)?;

        let w = ArrayView2::from_shape((self.outputs, self.inputs), w)
            .map_err(|_| mismatch(&self.weight, &[self.outputs, self.inputs], w.len()))?;
        let b = ArrayView1::from_shape(self.outputs, b)
            .map_err(|_| mismatch(&self.bias, &[self.outputs], b.len()))?;

        Ok((w, b))
    }

    fn view_mut<'a>(
        &self,
        grads: &'a mut ParameterSet,
        name: &str,
        shape: (usize, usize),
    ) -> Result<ArrayViewMut2<'a, f32>> {
        let data = grads
            .get_mut(name)
            .ok_or_else(|| mismatch(name, &[shape.0, shape.1], 0))?
            .data_mut();

        let len = data.len();
        ArrayViewMut2::from_shape(shape, data)
            .map_err(|_| mismatch(name, &[shape.0, shape.1], len))
    }

    fn view_mut_1d<'a>(
        &self,
        grads: &'a mut ParameterSet,
        name: &str,
    ) -> Result<ArrayViewMut1<'a, f32>> {
        let data = grads
            .get_mut(name)
            .ok_or_else(|| mismatch(name, &[self.outputs], 0))?
            .data_mut();

        let len = data.len();
        ArrayViewMut1::from_shape(self.outputs, data)
            .map_err(|_| mismatch(name, &[self.outputs], len))
    }
}

fn lookup<'a>(params: &'a ParameterSet, name: &str) -> Result<&'a [f32]> {
    params
        .get(name)
        .map(|t| t.data())
        .ok_or_else(|| mismatch(name, &[], 0))
}

fn mismatch(name: &str, expected: &[usize], got: usize) -> ShapeMismatchErr {
    ShapeMismatchErr::Tensor {
        name: name.to_string(),
        expected: expected.to_vec(),
        got: vec![got],
    }
}

/// Stacks the given states as the rows of a matrix.
///
/// # Returns
/// A `ShapeMismatchErr` if any state doesn't have `width` values.
pub fn stack<'a, I>(states: I, width: usize) -> Result<Array2<f32>>
where
    I: ExactSizeIterator<Item = &'a [f32]>,
{
    let rows = states.len();
    let mut flat = Vec::with_capacity(rows * width);

    for state in states {
        if state.len() != width {
            return Err(ShapeMismatchErr::Length {
                expected: width,
                got: state.len(),
            });
        }

        flat.extend_from_slice(state);
    }

    Array2::from_shape_vec((rows, width), flat).map_err(|_| ShapeMismatchErr::Length {
        expected: rows * width,
        got: rows * width,
    })
}
