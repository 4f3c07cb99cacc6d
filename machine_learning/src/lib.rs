//! Reference models for the rollout workers, linear function approximators on `ndarray`.

pub mod actor_critic;
pub mod linear;
pub mod q_network;
mod test;

pub use actor_critic::LinearActorCritic;
pub use linear::Linear;
pub use q_network::LinearQ;
