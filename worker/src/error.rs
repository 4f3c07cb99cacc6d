use std::{error::Error, fmt};

use parameter_server::{ServerErr, ShapeMismatchErr};

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker runtime failures, all of them end the worker.
#[derive(Debug)]
pub enum WorkerErr {
    /// The model, a gradient or a snapshot doesn't match the store's layout.
    ShapeMismatch(ShapeMismatchErr),
    /// The parameter server stopped or rejected a gradient.
    Server(ServerErr),
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::ShapeMismatch(e) => write!(f, "shape mismatch: {e}"),
            WorkerErr::Server(e) => write!(f, "parameter server error: {e}"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::ShapeMismatch(e) => Some(e),
            WorkerErr::Server(e) => Some(e),
        }
    }
}

impl From<ShapeMismatchErr> for WorkerErr {
    fn from(value: ShapeMismatchErr) -> Self {
        Self::ShapeMismatch(value)
    }
}

impl From<ServerErr> for WorkerErr {
    fn from(value: ServerErr) -> Self {
        match value {
            ServerErr::ShapeMismatch(e) => Self::ShapeMismatch(e),
            other => Self::Server(other),
        }
    }
}
