use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use rl_orchestration::{SessionBuilder, TrainingConfig, Variant};

/// Trains a reinforcement learning agent with several asynchronous workers sharing one set of
/// parameters.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON configuration file, flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How workers merge their gradients into the shared parameters.
    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// Amount of concurrent workers.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Most episodes per worker.
    #[arg(short, long)]
    episodes: Option<usize>,

    /// Discount factor.
    #[arg(long)]
    gamma: Option<f32>,

    /// Learning rate of the shared optimizer.
    #[arg(long)]
    lr: Option<f32>,

    /// Base seed, worker `i` uses `seed + i`.
    #[arg(long)]
    seed: Option<u64>,

    /// Where to save the final parameters.
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Checkpoint to resume training from.
    #[arg(long)]
    resume: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(TrainingConfig, Option<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::from_file(path)?,
            None => TrainingConfig::default(),
        };

        if let Some(variant) = self.variant {
            config.variant = variant;
        }
        if let Some(workers) = self.workers {
            config.workers = workers.try_into().context("workers must be at least 1")?;
        }
        if let Some(episodes) = self.episodes {
            config.episodes = episodes.try_into().context("episodes must be at least 1")?;
        }
        if let Some(gamma) = self.gamma {
            config.gamma = gamma;
        }
        if self.lr.is_some() {
            config.learning_rate = self.lr;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.checkpoint.is_some() {
            config.checkpoint = self.checkpoint;
        }

        config.validate()?;
        Ok((config, self.resume))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let (config, resume) = Cli::parse().into_config()?;
    info!(
        "training {:?} with {} workers, {} variant",
        config.model(),
        config.workers,
        config.variant
    );

    let mut session = SessionBuilder::new(config);
    if let Some(path) = resume {
        session = session.resume(path);
    }

    let report = session.run().await?;

    for failure in &report.failures {
        warn!("worker {} didn't finish: {}", failure.worker_id, failure.error);
    }

    if report.solved {
        info!("solved after {} episodes", report.episodes);
    } else {
        info!("not solved after {} episodes", report.episodes);
    }

    Ok(())
}
