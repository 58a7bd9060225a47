use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error(
        "'{key}' is specified both as a flag and in the configuration file \
         (from flag: {flag_value}, from file: {file_value})"
    )]
    Conflict {
        key: String,
        flag_value: String,
        file_value: String,
    },

    #[error("invalid size: '{text}'")]
    InvalidQuantity { text: String },

    #[error("invalid configuration for '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("invalid value for '{key}' in configuration file: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("configuration file contains unknown keys: {}", .0.join(", "))]
    UnknownKeys(Vec<String>),

    #[error("unknown flag: --{0}")]
    UnknownFlag(String),

    #[error("invalid value '{value}' for flag --{flag}: {reason}")]
    InvalidFlagValue {
        flag: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    /// The option or field this error is about, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Conflict { key, .. } | Self::InvalidValue { key, .. } => Some(key.as_str()),
            Self::Validation { field, .. } => Some(field.as_str()),
            Self::InvalidFlagValue { flag, .. } => Some(flag.as_str()),
            _ => None,
        }
    }
}
