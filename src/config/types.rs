use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::option::OptionId;
use super::quantity::Quantity;
use super::ConfigError;

/// Default size of `/dev/shm` for containers, 64 MiB.
pub const DEFAULT_SHM_SIZE: Quantity = Quantity::from_bytes(64 * 1024 * 1024);

/// Log driver used when none is configured.
pub const DEFAULT_LOG_DRIVER: &str = "json-file";

/// The daemon's full option set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub debug: bool,
    pub auto_restart: bool,
    pub log_config: LogConfig,
    #[serde(rename = "default-ulimits")]
    pub ulimits: BTreeMap<String, Ulimit>,
    #[serde(rename = "default-shm-size")]
    pub shm_size: Quantity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            auto_restart: false,
            log_config: LogConfig::default(),
            ulimits: BTreeMap::new(),
            shm_size: DEFAULT_SHM_SIZE,
        }
    }
}

/// Log driver and the options passed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(rename = "type")]
    pub driver_type: String,
    pub options: BTreeMap<String, String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            driver_type: DEFAULT_LOG_DRIVER.to_string(),
            options: BTreeMap::new(),
        }
    }
}

/// A named resource limit.
///
/// In config files this is written as `{"Name": "nofile", "Soft": 1024,
/// "Hard": 2048}`; on the command line as `nofile=1024:2048`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ulimit {
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "Soft", alias = "soft")]
    pub soft: i64,
    #[serde(rename = "Hard", alias = "hard")]
    pub hard: i64,
}

impl Ulimit {
    pub fn new(name: impl Into<String>, soft: i64, hard: i64) -> Self {
        Self {
            name: name.into(),
            soft,
            hard,
        }
    }
}

impl fmt::Display for Ulimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}:{}", self.name, self.soft, self.hard)
    }
}

impl FromStr for Ulimit {
    type Err = ConfigError;

    /// Parses `name=soft:hard`, or `name=value` for equal soft and hard limits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidFlagValue {
            flag: OptionId::DefaultUlimits.flag_name().to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (name, limits) = s
            .split_once('=')
            .ok_or_else(|| invalid("expected name=soft:hard"))?;
        if name.is_empty() {
            return Err(invalid("ulimit name must not be empty"));
        }

        let parse_limit = |text: &str| {
            text.parse::<i64>()
                .map_err(|_| invalid("limits must be integers"))
        };
        let (soft, hard) = match limits.split_once(':') {
            Some((soft, hard)) => (parse_limit(soft)?, parse_limit(hard)?),
            None => {
                let value = parse_limit(limits)?;
                (value, value)
            }
        };

        Ok(Self::new(name, soft, hard))
    }
}

/// Parses a `key=value` log driver option.
pub fn parse_log_opt(text: &str) -> Result<(String, String), ConfigError> {
    match text.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(ConfigError::InvalidFlagValue {
            flag: OptionId::LogOpts.flag_name().to_string(),
            value: text.to_string(),
            reason: "expected key=value".to_string(),
        }),
    }
}
