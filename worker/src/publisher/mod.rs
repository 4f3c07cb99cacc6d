mod direct;
mod publisher;
mod server;

pub use direct::DirectPublisher;
pub use publisher::{GradientPublisher, LocalGradientPublisher};
pub use server::ServerPublisher;
