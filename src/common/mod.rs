pub mod config;
pub mod errors;

pub use config::{BridgeConfig, CliOverrides, ConfigError};
pub use errors::AppError;
