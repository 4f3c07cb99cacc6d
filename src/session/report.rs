use log::info;
use parameter_server::ParameterSet;
use worker::WorkerMetrics;

use crate::config::Variant;

/// A worker that stopped with an error or panicked, its siblings kept running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub worker_id: usize,
    pub error: String,
}

/// The outcome of a finished training session.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub variant: Variant,
    /// The amount of gradients applied to the canonical parameters, including resumed ones.
    pub step: u64,
    /// The amount of episodes recorded by all workers.
    pub episodes: u64,
    pub solved: bool,
    /// The mean of the trailing score window.
    pub average: Option<f32>,
    /// The final canonical parameters.
    pub params: ParameterSet,
    /// The metrics of every worker that finished cleanly, by worker id.
    pub workers: Vec<(usize, WorkerMetrics)>,
    pub failures: Vec<WorkerFailure>,
    /// The amount of target refreshes, only for the server variant.
    pub target_refreshes: Option<u64>,
}

impl TrainingReport {
    /// The amount of gradients published by the workers that finished cleanly.
    pub fn published(&self) -> u64 {
        self.workers.iter().map(|(_, m)| m.published).sum()
    }

    /// The amount of episodes cut off at `max_steps` that didn't publish.
    pub fn truncated(&self) -> u64 {
        self.workers.iter().map(|(_, m)| m.truncated).sum()
    }

    /// The amount of backward passes discarded for being non finite.
    pub fn skipped(&self) -> u64 {
        self.workers.iter().map(|(_, m)| m.skipped).sum()
    }

    pub fn log_summary(&self) {
        info!(
            step = self.step,
            episodes = self.episodes,
            solved = self.solved;
            "{} training finished",
            self.variant
        );

        for (worker_id, m) in &self.workers {
            info!(
                "worker {worker_id}: {} episodes, {} published, {} skipped, {} truncated, \
                 mean staleness {:.2}, rollout {:?}, compute {:?}, publish {:?}",
                m.episodes,
                m.published,
                m.skipped,
                m.truncated,
                m.mean_staleness(),
                m.rollout_time,
                m.compute_time,
                m.publish_time,
            );
        }

        if let Some(average) = self.average {
            info!("final average score: {average:.3}");
        }
    }
}
