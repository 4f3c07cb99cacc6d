mod builder;
mod report;

pub use builder::SessionBuilder;
pub use report::{TrainingReport, WorkerFailure};
