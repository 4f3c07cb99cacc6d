use std::sync::Arc;

use ndarray::{Array2, Axis};
use parameter_server::{ParameterLayout, ParameterSet, ShapeMismatchErr, storage::Result};
use worker::{Backward, Model, Trajectory};

use crate::linear::{Linear, stack};

const ENTROPY_COEF: f32 = 0.001;
const VALUE_COEF: f32 = 0.5;

/// A linear policy and state-value function trained on discounted returns.
///
/// The loss is the advantage weighted policy gradient, plus the value regression towards the
/// returns, minus an entropy bonus. The advantage is treated as a constant.
#[derive(Debug, Clone)]
pub struct LinearActorCritic {
    policy: Linear,
    value: Linear,
}

impl LinearActorCritic {
    /// Creates a new `LinearActorCritic`.
    ///
    /// # Arguments
    /// * `state_dim` - The size of the states.
    /// * `num_actions` - The amount of discrete actions.
    ///
    /// # Returns
    /// A new `LinearActorCritic` instance.
    pub fn new(state_dim: usize, num_actions: usize) -> Self {
        Self {
            policy: Linear::new("policy", state_dim, num_actions),
            value: Linear::new("value", state_dim, 1),
        }
    }
}

impl Model for LinearActorCritic {
    fn layout(&self) -> Arc<ParameterLayout> {
        let layout = self.policy.extend(ParameterLayout::default());
        Arc::new(self.value.extend(layout))
    }

    /// Returns the policy logits.
    fn forward(&self, params: &ParameterSet, state: &[f32]) -> Result<Vec<f32>> {
        let x = stack([state].into_iter(), self.policy.inputs())?;
        let z = self.policy.forward(params, x.view())?;
        Ok(z.iter().copied().collect())
    }

    fn backward(
        &self,
        trajectory: &Trajectory,
        params: &ParameterSet,
        _target: Option<&ParameterSet>,
        gamma: f32,
    ) -> Result<Backward> {
        let mut grads = ParameterSet::zeros(Arc::clone(params.layout()));
        let n = trajectory.len();

        if n == 0 {
            return Ok(Backward { loss: 0., grads });
        }

        let states = stack(trajectory.iter().map(|t| t.state.as_slice()), self.policy.inputs())?;
        let logits = self.policy.forward(params, states.view())?;
        let values = self.value.forward(params, states.view())?;
        let returns = trajectory.discounted_returns(gamma);

        let scale = 1. / n as f32;
        let mut d_logits = Array2::zeros(logits.raw_dim());
        let mut d_values = Array2::zeros(values.raw_dim());
        let (mut policy_loss, mut value_loss, mut entropy) = (0., 0., 0.);

        let rows = logits.axis_iter(Axis(0)).zip(d_logits.axis_iter_mut(Axis(0)));
        for (i, (row, mut d_row)) in rows.enumerate() {
            let action = trajectory.transitions()[i].action;
            if action >= row.len() {
                return Err(ShapeMismatchErr::Length {
                    expected: row.len(),
                    got: action + 1,
                });
            }

            let log_probs = log_softmax(row.iter().copied());
            let h: f32 = -log_probs.iter().map(|lp| lp.exp() * lp).sum::<f32>();
            let advantage = returns[i] - values[[i, 0]];

            policy_loss -= log_probs[action] * advantage;
            entropy += h;

            for (j, (d, &lp)) in d_row.iter_mut().zip(&log_probs).enumerate() {
                let p = lp.exp();
                let onehot = if j == action { 1. } else { 0. };
                *d = (p - onehot) * advantage * scale
                    + ENTROPY_COEF * p * (lp + h) * scale;
            }

            let err = values[[i, 0]] - returns[i];
            value_loss += err * err;
            d_values[[i, 0]] = VALUE_COEF * 2. * err * scale;
        }

        self.policy.backward(&mut grads, states.view(), d_logits.view())?;
        self.value.backward(&mut grads, states.view(), d_values.view())?;

        let loss = (policy_loss + VALUE_COEF * value_loss - ENTROPY_COEF * entropy) * scale;
        Ok(Backward { loss, grads })
    }
}

fn log_softmax(z: impl Iterator<Item = f32> + Clone) -> Vec<f32> {
    let max = z.clone().fold(f32::NEG_INFINITY, f32::max);
    let log_sum = z.clone().map(|v| (v - max).exp()).sum::<f32>().ln();
    z.map(|v| v - max - log_sum).collect()
}
