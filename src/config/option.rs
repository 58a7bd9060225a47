//! The set of options the daemon understands.

use std::fmt;

/// Identifies one configuration option.
///
/// Each option has a command-line flag name and a key in the configuration
/// file. The two differ for the repeatable options (`--log-opt` is stored
/// under `log-opts`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionId {
    Debug,
    AutoRestart,
    LogDriver,
    LogOpts,
    DefaultUlimits,
    DefaultShmSize,
}

impl OptionId {
    pub const ALL: [OptionId; 6] = [
        OptionId::Debug,
        OptionId::AutoRestart,
        OptionId::LogDriver,
        OptionId::LogOpts,
        OptionId::DefaultUlimits,
        OptionId::DefaultShmSize,
    ];

    pub const fn flag_name(self) -> &'static str {
        match self {
            OptionId::Debug => "debug",
            OptionId::AutoRestart => "auto-restart",
            OptionId::LogDriver => "log-driver",
            OptionId::LogOpts => "log-opt",
            OptionId::DefaultUlimits => "default-ulimit",
            OptionId::DefaultShmSize => "default-shm-size",
        }
    }

    pub const fn file_key(self) -> &'static str {
        match self {
            OptionId::Debug => "debug",
            OptionId::AutoRestart => "auto-restart",
            OptionId::LogDriver => "log-driver",
            OptionId::LogOpts => "log-opts",
            OptionId::DefaultUlimits => "default-ulimits",
            OptionId::DefaultShmSize => "default-shm-size",
        }
    }

    /// Looks up an option by flag name. `default-ulimits` is accepted as an
    /// alias of `default-ulimit`.
    pub fn from_flag_name(name: &str) -> Option<Self> {
        match name {
            "default-ulimits" => Some(OptionId::DefaultUlimits),
            _ => Self::ALL.into_iter().find(|id| id.flag_name() == name),
        }
    }

    pub fn from_file_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.file_key() == key)
    }

    /// Whether the option is a map merged key by key.
    pub const fn is_nested(self) -> bool {
        matches!(self, OptionId::LogOpts | OptionId::DefaultUlimits)
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_key())
    }
}
