use std::{
    fmt, fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use worker::{ExplorationPolicy, ExplorationSchedule};

use crate::error::ConfigErr;

/// The gradient merge protocol of a training session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Workers apply their gradients straight into the shared store.
    #[default]
    Direct,
    /// Workers send their gradients to a parameter server that also keeps a target copy.
    Server,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Server => f.write_str("server"),
        }
    }
}

/// The reference model trained by the workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    ActorCritic,
    QNetwork,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    GradientDescent {
        lr: f32,
    },
    Momentum {
        lr: f32,
        momentum: f32,
    },
    Adam {
        lr: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
}

impl OptimizerConfig {
    pub fn learning_rate(&self) -> f32 {
        match *self {
            Self::GradientDescent { lr } | Self::Momentum { lr, .. } | Self::Adam { lr, .. } => lr,
        }
    }

    pub fn set_learning_rate(&mut self, value: f32) {
        match self {
            Self::GradientDescent { lr } | Self::Momentum { lr, .. } | Self::Adam { lr, .. } => {
                *lr = value
            }
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam {
            lr: 5e-4,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanSchemeConfig {
    XavierUniform,
    Xavier,
    Kaiming,
    LecunUniform,
    Lecun,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitConfig {
    Const { value: f32 },
    Uniform { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
    Fan { scheme: FanSchemeConfig },
}

impl Default for InitConfig {
    fn default() -> Self {
        Self::Fan {
            scheme: FanSchemeConfig::XavierUniform,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyConfig {
    #[default]
    EpsilonGreedy,
    Sampling,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub policy: PolicyConfig,
    pub start: f32,
    pub end: f32,
    pub decay: f32,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            start: 1.0,
            end: 0.01,
            decay: 0.995,
        }
    }
}

impl ExplorationConfig {
    pub fn schedule(&self) -> ExplorationSchedule {
        ExplorationSchedule::new(self.start, self.end, self.decay)
    }

    pub fn policy(&self) -> ExplorationPolicy {
        match self.policy {
            PolicyConfig::EpsilonGreedy => ExplorationPolicy::EpsilonGreedy,
            PolicyConfig::Sampling => ExplorationPolicy::Sampling,
        }
    }
}

/// The demo environment's tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorridorConfig {
    pub length: usize,
    pub step_penalty: f32,
    pub goal_reward: f32,
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            length: 8,
            step_penalty: 0.01,
            goal_reward: 1.0,
        }
    }
}

/// Everything needed to run a training session, loaded from JSON with every field defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub variant: Variant,
    /// The trained model, by default the actor-critic for `direct` and the Q network for
    /// `server`.
    pub model: Option<ModelKind>,
    pub workers: NonZeroUsize,
    /// The episode budget of each worker.
    pub episodes: NonZeroUsize,
    /// A cap on the episodes of all workers together.
    pub max_episodes: Option<u64>,
    pub max_steps: NonZeroUsize,
    pub gamma: f32,
    pub optimizer: OptimizerConfig,
    /// Overrides the optimizer's learning rate.
    pub learning_rate: Option<f32>,
    /// The amount of applied gradients between target refreshes.
    pub update_every: NonZeroUsize,
    pub mailbox: NonZeroUsize,
    pub window: NonZeroUsize,
    pub solved_threshold: f32,
    pub exploration: ExplorationConfig,
    pub init: InitConfig,
    pub seed: Option<u64>,
    pub corridor: CorridorConfig,
    pub checkpoint: Option<PathBuf>,
}

const fn nonzero(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => NonZeroUsize::MIN,
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            model: None,
            workers: nonzero(3),
            episodes: nonzero(2000),
            max_episodes: None,
            max_steps: nonzero(1000),
            gamma: 0.99,
            optimizer: OptimizerConfig::default(),
            learning_rate: None,
            update_every: nonzero(5),
            mailbox: nonzero(64),
            window: nonzero(100),
            solved_threshold: 0.9,
            exploration: ExplorationConfig::default(),
            init: InitConfig::default(),
            seed: None,
            corridor: CorridorConfig::default(),
            checkpoint: None,
        }
    }
}

impl TrainingConfig {
    /// Reads a JSON configuration file, missing fields take their default value.
    ///
    /// # Arguments
    /// * `path` - The path of the file.
    ///
    /// # Returns
    /// The parsed configuration or a `ConfigErr`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigErr> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigErr::new(format!("reading {}: {e}", path.display())))?;

        serde_json::from_str(&raw)
            .map_err(|e| ConfigErr::new(format!("parsing {}: {e}", path.display())))
    }

    /// The model to train, falling back to the variant's default.
    pub fn model(&self) -> ModelKind {
        self.model.unwrap_or(match self.variant {
            Variant::Direct => ModelKind::ActorCritic,
            Variant::Server => ModelKind::QNetwork,
        })
    }

    /// The optimizer with the learning rate override applied.
    pub fn optimizer(&self) -> OptimizerConfig {
        let mut optimizer = self.optimizer;
        if let Some(lr) = self.learning_rate {
            optimizer.set_learning_rate(lr);
        }
        optimizer
    }

    /// The seed of the given worker, its id unless a base seed is set.
    pub fn worker_seed(&self, worker_id: usize) -> u64 {
        self.seed.unwrap_or(0).wrapping_add(worker_id as u64)
    }

    /// Checks the values the types alone can't restrict.
    ///
    /// # Returns
    /// A `ConfigErr` describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigErr> {
        if !(self.gamma > 0. && self.gamma <= 1.) {
            return Err(ConfigErr::new(format!("gamma must be in (0, 1], got {}", self.gamma)));
        }

        let lr = self.optimizer().learning_rate();
        if !(lr.is_finite() && lr > 0.) {
            return Err(ConfigErr::new(format!("learning rate must be positive, got {lr}")));
        }

        let ExplorationConfig {
            start, end, decay, ..
        } = self.exploration;

        for (name, rate) in [("start", start), ("end", end)] {
            if !(0. ..=1.).contains(&rate) {
                return Err(ConfigErr::new(format!(
                    "exploration {name} must be in [0, 1], got {rate}"
                )));
            }
        }

        if start < end {
            return Err(ConfigErr::new(format!(
                "exploration start ({start}) must not be below its end ({end})"
            )));
        }

        if !(decay > 0. && decay <= 1.) {
            return Err(ConfigErr::new(format!(
                "exploration decay must be in (0, 1], got {decay}"
            )));
        }

        if self.corridor.length < 2 {
            return Err(ConfigErr::new("corridor length must be at least 2"));
        }

        if self.max_episodes == Some(0) {
            return Err(ConfigErr::new("max_episodes must be at least 1"));
        }

        Ok(())
    }
}
