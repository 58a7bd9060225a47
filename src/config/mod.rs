//! Daemon configuration: defaults, command-line flags and the config file.

mod error;
mod file;
mod flags;
mod merge;
mod option;
mod quantity;
mod types;
mod validate;

pub use error::ConfigError;
pub use file::{load, RawFileConfig};
pub use flags::FlagRegistry;
pub use merge::{merge_configurations, Merger};
pub use option::OptionId;
pub use quantity::{parse_quantity, Quantity};
pub use types::{parse_log_opt, Config, LogConfig, Ulimit, DEFAULT_LOG_DRIVER, DEFAULT_SHM_SIZE};
pub use validate::validate;
