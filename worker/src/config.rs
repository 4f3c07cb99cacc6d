use std::num::NonZeroUsize;

use crate::{ExplorationPolicy, ExplorationSchedule};

const EPISODES: NonZeroUsize = NonZeroUsize::new(100).unwrap();
const MAX_STEPS: NonZeroUsize = NonZeroUsize::new(1000).unwrap();
const REPORT_EVERY: NonZeroUsize = NonZeroUsize::new(100).unwrap();

/// Immutable execution bounds for a worker instance.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Identifier used for seeding and observability.
    pub worker_id: usize,
    /// The most episodes this worker will run.
    pub episodes: NonZeroUsize,
    /// The most transitions in a single episode.
    pub max_steps: NonZeroUsize,
    /// The discount factor handed to the model.
    pub gamma: f32,
    pub schedule: ExplorationSchedule,
    pub policy: ExplorationPolicy,
    /// The seed of the worker's action selection.
    pub seed: u64,
    /// The amount of own episodes between two progress reports.
    pub report_every: NonZeroUsize,
    /// Whether an episode cut off at `max_steps` still publishes a gradient.
    pub train_truncated: bool,
}

impl WorkerConfig {
    /// Creates a new worker configuration with the default bounds.
    ///
    /// # Args
    /// * `worker_id` - The id of the worker, also used as its seed.
    ///
    /// # Returns
    /// A `WorkerConfig` instance.
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            episodes: EPISODES,
            max_steps: MAX_STEPS,
            gamma: 0.99,
            schedule: ExplorationSchedule::default(),
            policy: ExplorationPolicy::default(),
            seed: worker_id as u64,
            report_every: REPORT_EVERY,
            train_truncated: false,
        }
    }
}
