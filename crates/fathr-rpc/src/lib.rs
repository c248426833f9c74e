pub mod config;
pub mod protocol;
pub mod server;
pub mod view;

pub use config::{init_tracing, ServerConfig};
pub use server::ScoringServer;
