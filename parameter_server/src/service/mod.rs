mod client;
mod config;
mod error;
mod request;
mod server;

pub use client::ServerClient;
pub use config::ServerConfig;
pub use error::{Result, ServerErr};
pub use server::{ParameterServer, ServerReport};
