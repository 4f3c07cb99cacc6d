pub mod config;
pub mod coordinator;
pub mod environment;
pub mod error;
pub mod exploration;
pub mod metrics;
pub mod model;
pub mod publisher;
pub mod replica;
pub mod trajectory;
pub mod update;
pub mod worker;

pub use config::WorkerConfig;
pub use coordinator::{EpisodeCoordinator, EpisodeRecord};
pub use environment::{Environment, Step};
pub use error::{Result, WorkerErr};
pub use exploration::{ExplorationPolicy, ExplorationSchedule};
pub use metrics::WorkerMetrics;
pub use model::{Backward, Model};
pub use publisher::{DirectPublisher, GradientPublisher, ServerPublisher};
pub use replica::ModelReplica;
pub use trajectory::{Trajectory, Transition};
pub use update::GradientUpdate;
pub use worker::Worker;
