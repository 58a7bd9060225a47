use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type for the daemon-config library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("command line error: {0}")]
    Cli(#[from] clap::Error),
}
