use rand::{Rng, SeedableRng, rngs::StdRng};
use worker::{Environment, Step};

use crate::config::CorridorConfig;

const LEFT: usize = 0;

/// A one dimensional corridor, the agent walks left or right until it reaches the last cell.
///
/// Every step costs `step_penalty`, reaching the goal pays `goal_reward`. Each episode starts
/// at a random cell of the first half, drawn from the environment's seeded generator.
#[derive(Debug, Clone)]
pub struct Corridor {
    config: CorridorConfig,
    position: usize,
    rng: StdRng,
}

impl Corridor {
    /// Creates a new `Corridor`.
    ///
    /// # Arguments
    /// * `config` - The corridor's length and rewards.
    /// * `seed` - The seed for the starting positions.
    ///
    /// # Returns
    /// A new `Corridor` instance.
    pub fn new(config: CorridorConfig, seed: u64) -> Self {
        Self {
            config,
            position: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// The size of the states, one-hot over the cells.
    pub fn state_dim(&self) -> usize {
        self.config.length
    }

    fn goal(&self) -> usize {
        self.config.length.saturating_sub(1)
    }

    fn state(&self) -> Vec<f32> {
        let mut state = vec![0.; self.config.length];
        if let Some(cell) = state.get_mut(self.position) {
            *cell = 1.;
        }
        state
    }
}

impl Environment for Corridor {
    fn reset(&mut self) -> Vec<f32> {
        let half = (self.config.length / 2).max(1);
        self.position = self.rng.random_range(0..half);
        self.state()
    }

    fn step(&mut self, action: usize) -> Step {
        self.position = match action {
            LEFT => self.position.saturating_sub(1),
            _ => (self.position + 1).min(self.goal()),
        };

        let done = self.position == self.goal();
        let mut reward = -self.config.step_penalty;
        if done {
            reward += self.config.goal_reward;
        }

        Step {
            state: self.state(),
            reward,
            done,
        }
    }

    fn num_actions(&self) -> usize {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walking_right_reaches_the_goal() {
        let config = CorridorConfig::default();
        let mut env = Corridor::new(config, 0);
        let state = env.reset();
        assert_eq!(state.len(), env.state_dim());
        assert_eq!(state.iter().sum::<f32>(), 1.);

        let start = env.position();
        let mut last = None;
        for _ in start..config.length - 1 {
            last = Some(env.step(1));
        }

        let last = last.unwrap();
        assert!(last.done);
        assert_eq!(last.state[config.length - 1], 1.);
        assert!((last.reward - (config.goal_reward - config.step_penalty)).abs() < 1e-6);
    }

    #[test]
    fn left_wall_holds() {
        let mut env = Corridor::new(CorridorConfig::default(), 1);
        env.reset();

        for _ in 0..20 {
            let step = env.step(LEFT);
            assert!(!step.done);
            assert_eq!(step.reward, -0.01);
        }

        assert_eq!(env.position(), 0);
    }

    #[test]
    fn same_seed_same_starts() {
        let mut a = Corridor::new(CorridorConfig::default(), 9);
        let mut b = Corridor::new(CorridorConfig::default(), 9);

        for _ in 0..10 {
            assert_eq!(a.reset(), b.reset());
        }
    }
}
