use std::{error::Error, fmt, io};

use parameter_server::{ShapeMismatchErr, initialization::InitErr};
use safetensors::SafeTensorError;
use worker::WorkerErr;

/// The session module's result type.
pub type Result<T> = std::result::Result<T, SessionErr>;

/// An invalid training configuration, caught before anything is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigErr(String);

impl ConfigErr {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid config: {}", self.0)
    }
}

impl Error for ConfigErr {}

/// Failures reading or writing a parameter checkpoint.
#[derive(Debug)]
pub enum CheckpointErr {
    Io(io::Error),
    Format(SafeTensorError),
    /// A stored tensor isn't `f32`.
    DType { name: String },
    /// The stored tensors don't match the model's layout.
    Shape(ShapeMismatchErr),
    /// The step metadata is missing or not a number.
    Step,
}

impl fmt::Display for CheckpointErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "checkpoint io error: {e}"),
            Self::Format(e) => write!(f, "malformed checkpoint: {e}"),
            Self::DType { name } => write!(f, "checkpoint tensor `{name}` is not f32"),
            Self::Shape(e) => write!(f, "checkpoint doesn't fit the model: {e}"),
            Self::Step => f.write_str("checkpoint has no valid step metadata"),
        }
    }
}

impl Error for CheckpointErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Format(e) => Some(e),
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CheckpointErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SafeTensorError> for CheckpointErr {
    fn from(value: SafeTensorError) -> Self {
        Self::Format(value)
    }
}

impl From<ShapeMismatchErr> for CheckpointErr {
    fn from(value: ShapeMismatchErr) -> Self {
        Self::Shape(value)
    }
}

/// Everything that can stop a training session from starting or finishing.
///
/// A single crashed worker isn't one of them, crashes are collected in the `TrainingReport`.
#[derive(Debug)]
pub enum SessionErr {
    Config(ConfigErr),
    Init(InitErr),
    /// The model doesn't fit the store.
    ShapeMismatch(ShapeMismatchErr),
    /// A worker couldn't be built.
    Worker { worker_id: usize, source: WorkerErr },
    /// The parameter server task panicked.
    ServerCrashed(String),
    Checkpoint(CheckpointErr),
}

impl fmt::Display for SessionErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Init(e) => write!(f, "invalid initializer: {e}"),
            Self::ShapeMismatch(e) => write!(f, "shape mismatch: {e}"),
            Self::Worker { worker_id, source } => write!(f, "worker {worker_id} error: {source}"),
            Self::ServerCrashed(msg) => write!(f, "parameter server crashed: {msg}"),
            Self::Checkpoint(e) => write!(f, "{e}"),
        }
    }
}

impl Error for SessionErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Init(e) => Some(e),
            Self::ShapeMismatch(e) => Some(e),
            Self::Worker { source, .. } => Some(source),
            Self::ServerCrashed(_) => None,
            Self::Checkpoint(e) => Some(e),
        }
    }
}

impl From<ConfigErr> for SessionErr {
    fn from(value: ConfigErr) -> Self {
        Self::Config(value)
    }
}

impl From<InitErr> for SessionErr {
    fn from(value: InitErr) -> Self {
        Self::Init(value)
    }
}

impl From<ShapeMismatchErr> for SessionErr {
    fn from(value: ShapeMismatchErr) -> Self {
        Self::ShapeMismatch(value)
    }
}

impl From<CheckpointErr> for SessionErr {
    fn from(value: CheckpointErr) -> Self {
        Self::Checkpoint(value)
    }
}
