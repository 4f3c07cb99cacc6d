use std::slice;

/// A single `(state, action, reward, next_state, done)` tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
    pub done: bool,
}

/// The ordered transitions of one rollout.
///
/// Produced by a worker, handed once to the model for the backward pass and then dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    transitions: Vec<Transition>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn iter(&self) -> slice::Iter<'_, Transition> {
        self.transitions.iter()
    }

    /// Whether the rollout reached a terminal state instead of being cut short.
    pub fn is_terminal(&self) -> bool {
        self.transitions.last().is_some_and(|t| t.done)
    }

    /// Returns the undiscounted sum of rewards of the rollout.
    pub fn score(&self) -> f32 {
        self.transitions.iter().map(|t| t.reward).sum()
    }

    /// Computes the discounted return from every step until the end of the rollout.
    ///
    /// # Arguments
    /// * `gamma` - The discount factor.
    ///
    /// # Returns
    /// One return per transition, `G_t = r_t + gamma * G_{t+1}`.
    pub fn discounted_returns(&self, gamma: f32) -> Vec<f32> {
        let mut returns = vec![0.; self.transitions.len()];
        let mut acc = 0.;

        for (ret, t) in returns.iter_mut().zip(&self.transitions).rev() {
            acc = t.reward + gamma * acc;
            *ret = acc;
        }

        returns
    }
}
