/// The outcome of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: Vec<f32>,
    pub reward: f32,
    pub done: bool,
}

/// The stepping contract of an environment.
///
/// Implementations are expected to be deterministic given the seed they were built with, the
/// worker builds one environment per worker seeded from its id.
pub trait Environment {
    /// Starts a new episode, returning the initial state.
    fn reset(&mut self) -> Vec<f32>;

    /// Advances the episode by one action.
    fn step(&mut self, action: usize) -> Step;

    /// The amount of discrete actions the environment accepts.
    fn num_actions(&self) -> usize;
}
