use rand::{
    Rng,
    distr::{Distribution, weighted::WeightedIndex},
};

/// A multiplicative exploration rate decay with a floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationSchedule {
    epsilon: f32,
    end: f32,
    decay: f32,
}

impl ExplorationSchedule {
    /// Creates a new `ExplorationSchedule`.
    ///
    /// # Arguments
    /// * `start` - The rate of the first episode, expected to be at least `end`.
    /// * `end` - The lowest rate the schedule decays to.
    /// * `decay` - The factor applied after every episode.
    ///
    /// # Returns
    /// A new `ExplorationSchedule` instance.
    pub fn new(start: f32, end: f32, decay: f32) -> Self {
        Self {
            epsilon: start,
            end,
            decay,
        }
    }

    /// The rate for the current episode.
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Moves on to the next episode.
    pub fn advance(&mut self) {
        self.epsilon = (self.epsilon * self.decay).max(self.end);
    }
}

impl Default for ExplorationSchedule {
    fn default() -> Self {
        Self::new(1.0, 0.01, 0.995)
    }
}

/// How a worker turns the model's action scores into an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExplorationPolicy {
    /// A uniformly random action with probability epsilon, the best scored one otherwise.
    #[default]
    EpsilonGreedy,
    /// An action sampled from the softmax of the scores, epsilon is ignored.
    Sampling,
}

impl ExplorationPolicy {
    /// Picks an action.
    ///
    /// # Arguments
    /// * `scores` - One score per action, must not be empty.
    /// * `epsilon` - The current exploration rate.
    /// * `rng` - The worker's random number generator.
    ///
    /// # Returns
    /// The index of the chosen action.
    pub fn select<R: Rng>(&self, scores: &[f32], epsilon: f32, rng: &mut R) -> usize {
        match self {
            Self::EpsilonGreedy => {
                if rng.random::<f32>() < epsilon {
                    rng.random_range(0..scores.len().max(1))
                } else {
                    argmax(scores)
                }
            }
            // Non finite scores can't be weighted, fall back to the greedy action.
            Self::Sampling => WeightedIndex::new(softmax(scores))
                .map(|dist| dist.sample(rng))
                .unwrap_or_else(|_| argmax(scores)),
        }
    }
}

/// Returns the index of the highest score, the first one on ties.
pub fn argmax(scores: &[f32]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &s)| {
            if s > max { (i, s) } else { (best, max) }
        })
        .0
}

/// Numerically stable softmax.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn schedule_decays_to_floor() {
        let mut schedule = ExplorationSchedule::new(1.0, 0.5, 0.5);
        assert_eq!(schedule.epsilon(), 1.0);

        schedule.advance();
        assert_eq!(schedule.epsilon(), 0.5);

        schedule.advance();
        assert_eq!(schedule.epsilon(), 0.5);
    }

    #[test]
    fn greedy_without_exploration() {
        let mut rng = StdRng::seed_from_u64(0);
        let policy = ExplorationPolicy::EpsilonGreedy;

        for _ in 0..20 {
            assert_eq!(policy.select(&[0.1, 0.7, 0.3], 0., &mut rng), 1);
        }
    }

    #[test]
    fn full_exploration_visits_every_action() {
        let mut rng = StdRng::seed_from_u64(3);
        let policy = ExplorationPolicy::EpsilonGreedy;
        let mut seen = [false; 3];

        for _ in 0..200 {
            seen[policy.select(&[0.1, 0.7, 0.3], 1., &mut rng)] = true;
        }

        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn sampling_prefers_dominant_action() {
        let mut rng = StdRng::seed_from_u64(11);
        let policy = ExplorationPolicy::Sampling;

        let picks = (0..100)
            .filter(|_| policy.select(&[0., 20., 0.], 1., &mut rng) == 1)
            .count();

        assert!(picks > 95);
    }

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[1., 2., 3.]);
        assert!((probs.iter().sum::<f32>() - 1.).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn sampling_with_nan_scores_is_greedy() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(ExplorationPolicy::Sampling.select(&[f32::NAN, 1., 0.5], 0., &mut rng), 1);
    }
}
