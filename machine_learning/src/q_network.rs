use std::sync::Arc;

use ndarray::{Array2, Axis};
use parameter_server::{ParameterLayout, ParameterSet, ShapeMismatchErr, storage::Result};
use worker::{Backward, Model, Trajectory};

use crate::linear::{Linear, stack};

/// A linear action-value function trained with one step TD targets.
///
/// The targets `r + gamma * max_a Q(s', a)` are computed with the target parameters when they
/// are given and with the online ones otherwise, in both cases they're treated as constants.
#[derive(Debug, Clone)]
pub struct LinearQ {
    q: Linear,
}

impl LinearQ {
    /// Creates a new `LinearQ`.
    ///
    /// # Arguments
    /// * `state_dim` - The size of the states.
    /// * `num_actions` - The amount of discrete actions.
    ///
    /// # Returns
    /// A new `LinearQ` instance.
    pub fn new(state_dim: usize, num_actions: usize) -> Self {
        Self {
            q: Linear::new("q", state_dim, num_actions),
        }
    }
}

impl Model for LinearQ {
    fn layout(&self) -> Arc<ParameterLayout> {
        Arc::new(self.q.extend(ParameterLayout::default()))
    }

    fn forward(&self, params: &ParameterSet, state: &[f32]) -> Result<Vec<f32>> {
        let x = stack([state].into_iter(), self.q.inputs())?;
        let z = self.q.forward(params, x.view())?;
        Ok(z.iter().copied().collect())
    }

    fn backward(
        &self,
        trajectory: &Trajectory,
        params: &ParameterSet,
        target: Option<&ParameterSet>,
        gamma: f32,
    ) -> Result<Backward> {
        let mut grads = ParameterSet::zeros(Arc::clone(params.layout()));
        let n = trajectory.len();

        if n == 0 {
            return Ok(Backward { loss: 0., grads });
        }

        let width = self.q.inputs();
        let states = stack(trajectory.iter().map(|t| t.state.as_slice()), width)?;
        let next = stack(trajectory.iter().map(|t| t.next_state.as_slice()), width)?;

        let q = self.q.forward(params, states.view())?;
        let q_next = self.q.forward(target.unwrap_or(params), next.view())?;

        let mut d = Array2::zeros(q.raw_dim());
        let mut loss = 0.;

        for ((i, t), next_row) in trajectory.iter().enumerate().zip(q_next.axis_iter(Axis(0))) {
            if t.action >= self.q.outputs() {
                return Err(ShapeMismatchErr::Length {
                    expected: self.q.outputs(),
                    got: t.action + 1,
                });
            }

            let bootstrap = if t.done {
                0.
            } else {
                next_row.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v))
            };

            let err = q[[i, t.action]] - (t.reward + gamma * bootstrap);
            loss += err * err;
            d[[i, t.action]] = 2. * err / n as f32;
        }

        self.q.backward(&mut grads, states.view(), d.view())?;

        Ok(Backward {
            loss: loss / n as f32,
            grads,
        })
    }
}
