use std::time::Duration;

/// Per worker counters, returned when the worker finishes.
#[derive(Debug, Default, Clone)]
pub struct WorkerMetrics {
    pub sync_time: Duration,
    pub rollout_time: Duration,
    pub compute_time: Duration,
    pub publish_time: Duration,

    pub episodes: u64,
    pub steps: u64,
    pub published: u64,
    pub skipped: u64,
    pub truncated: u64,

    pub total_staleness: u64,
    pub max_staleness: u64,
    pub last_score: f32,
}

impl WorkerMetrics {
    #[inline]
    pub fn bump_episode(&mut self, steps: usize, score: f32) {
        self.episodes += 1;
        self.steps += steps as u64;
        self.last_score = score;
    }

    #[inline]
    pub fn record_publish(&mut self, staleness: u64) {
        self.published += 1;
        self.total_staleness += staleness;
        self.max_staleness = self.max_staleness.max(staleness);
    }

    #[inline]
    pub fn bump_skipped(&mut self) {
        self.skipped += 1;
    }

    #[inline]
    pub fn bump_truncated(&mut self) {
        self.truncated += 1;
    }

    /// The mean amount of foreign updates applied between a sync and the matching publish.
    pub fn mean_staleness(&self) -> f64 {
        if self.published == 0 {
            return 0.;
        }

        self.total_staleness as f64 / self.published as f64
    }
}
