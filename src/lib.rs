pub mod cli;
pub mod config;
pub mod context;
mod error;
pub mod logging;

pub use config::{merge_configurations, Config, ConfigError, FlagRegistry, Merger};
pub use context::DaemonContext;
pub use error::Error;
