mod error;
mod handle;
mod snapshot;
mod store;

pub use error::{Result, ShapeMismatchErr};
pub use handle::StoreHandle;
pub use snapshot::{Snapshot, SnapshotCell};
pub use store::ParameterStore;
