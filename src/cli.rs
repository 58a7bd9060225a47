//! Command-line flags for the daemon.
//!
//! Flags are parsed with `clap`, then copied into a [`FlagRegistry`]. Only
//! values that actually came from the command line are copied, so clap
//! defaults never count as explicitly set.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};

use crate::config::{ConfigError, FlagRegistry, OptionId};
use crate::Error;

/// Daemon configuration flags.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "daemon-config",
    version,
    about = "Merge daemon flags with a configuration file and print the result"
)]
pub struct DaemonArgs {
    /// Daemon configuration file (JSON, or TOML with a .toml extension).
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Reject configuration files containing unknown keys.
    #[arg(long)]
    pub strict_config: bool,

    /// Enable debug mode.
    #[arg(long, id = "debug")]
    pub debug: bool,

    /// Restart containers automatically when the daemon starts.
    #[arg(long = "auto-restart", id = "auto-restart")]
    pub auto_restart: bool,

    /// Default log driver.
    #[arg(long = "log-driver", id = "log-driver", value_name = "DRIVER")]
    pub log_driver: Option<String>,

    /// Default log driver option. May be repeated.
    #[arg(long = "log-opt", id = "log-opt", value_name = "KEY=VALUE")]
    pub log_opts: Vec<String>,

    /// Default ulimit for containers. May be repeated.
    #[arg(
        long = "default-ulimit",
        id = "default-ulimit",
        visible_alias = "default-ulimits",
        value_name = "NAME=SOFT:HARD"
    )]
    pub default_ulimits: Vec<String>,

    /// Default shared memory size for containers.
    #[arg(
        long = "default-shm-size",
        id = "default-shm-size",
        value_name = "SIZE",
        default_value = "64M"
    )]
    pub default_shm_size: String,
}

/// Parses `args` (including the program name) into flags and a registry.
pub fn parse_from<I, T>(args: I) -> Result<(DaemonArgs, FlagRegistry), Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = DaemonArgs::command().try_get_matches_from(args)?;
    let parsed = DaemonArgs::from_arg_matches(&matches)?;
    let registry = registry_from_matches(&matches)?;
    Ok((parsed, registry))
}

/// Builds a registry holding the compiled defaults plus every option given
/// on the command line.
pub fn registry_from_matches(matches: &ArgMatches) -> Result<FlagRegistry, ConfigError> {
    let mut registry = FlagRegistry::new();

    for id in OptionId::ALL {
        let name = id.flag_name();
        if matches.value_source(name) != Some(ValueSource::CommandLine) {
            continue;
        }
        match id {
            OptionId::Debug | OptionId::AutoRestart => {
                registry.set_option(id, &matches.get_flag(name).to_string())?;
            }
            _ => {
                for value in matches.get_many::<String>(name).into_iter().flatten() {
                    registry.set_option(id, value)?;
                }
            }
        }
    }

    Ok(registry)
}
