pub mod checkpoint;
pub mod config;
pub mod environment;
pub mod error;
pub mod session;

pub use config::{ModelKind, TrainingConfig, Variant};
pub use environment::Corridor;
pub use error::{CheckpointErr, ConfigErr, Result, SessionErr};
pub use session::{SessionBuilder, TrainingReport, WorkerFailure};
