pub mod initialization;
pub mod optimization;
pub mod parameters;
pub mod service;
pub mod storage;
mod test;

pub use parameters::{ParameterLayout, ParameterSet, Tensor, TensorSpec};
pub use service::{ParameterServer, ServerClient, ServerConfig, ServerErr, ServerReport};
pub use storage::{ParameterStore, ShapeMismatchErr, Snapshot, SnapshotCell, StoreHandle};
