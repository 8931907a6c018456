mod engine;
mod errors;
mod forward;
mod logging;
mod root;
mod server;

pub use engine::EngineConfig;
pub use errors::ConfigError;
pub use forward::ForwardConfig;
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
pub use server::{ListenerConfig, ServerConfig};
