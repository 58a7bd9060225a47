//! Command-line flag values and which of them were explicitly set.

use std::collections::BTreeSet;

use super::option::OptionId;
use super::quantity::Quantity;
use super::types::{parse_log_opt, Config, Ulimit};
use super::ConfigError;

/// Holds the value of every registered flag and tracks which ones the caller
/// set explicitly.
///
/// The registry starts from a set of defaults. Every successful call to
/// [`set`](Self::set) updates the value and marks the option as changed.
/// Options that were never set keep their default and report
/// `changed() == false`, even if the default happens to match what a config
/// file says.
///
/// ```
/// use daemon_config::config::{FlagRegistry, OptionId};
///
/// let mut flags = FlagRegistry::new();
/// assert_eq!(flags.config().shm_size.bytes(), 64 * 1024 * 1024);
///
/// flags.set("default-shm-size", "128M")?;
/// assert!(flags.changed(OptionId::DefaultShmSize));
/// assert_eq!(flags.config().shm_size.bytes(), 128 * 1024 * 1024);
/// # Ok::<(), daemon_config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagRegistry {
    values: Config,
    changed: BTreeSet<OptionId>,
    // Map entries given on the command line, as opposed to defaults.
    changed_entries: BTreeSet<(OptionId, String)>,
}

impl FlagRegistry {
    /// Registers all options with their compiled defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers all options with the given defaults.
    pub fn with_defaults(defaults: Config) -> Self {
        Self {
            values: defaults,
            changed: BTreeSet::new(),
            changed_entries: BTreeSet::new(),
        }
    }

    /// Current values of all registered options.
    pub fn config(&self) -> &Config {
        &self.values
    }

    pub fn changed(&self, id: OptionId) -> bool {
        self.changed.contains(&id)
    }

    /// Whether the entry `key` of a map option was set on the command line.
    /// Entries that only come from the registry defaults report `false`.
    pub fn changed_entry(&self, id: OptionId, key: &str) -> bool {
        self.changed_entries.contains(&(id, key.to_string()))
    }

    pub fn changed_options(&self) -> impl Iterator<Item = OptionId> + '_ {
        self.changed.iter().copied()
    }

    /// Sets a flag by its command-line name.
    ///
    /// Repeatable flags (`log-opt`, `default-ulimit`) add one entry per call.
    pub fn set(&mut self, flag: &str, value: &str) -> Result<(), ConfigError> {
        let id = OptionId::from_flag_name(flag)
            .ok_or_else(|| ConfigError::UnknownFlag(flag.to_string()))?;
        self.set_option(id, value)
    }

    pub fn set_option(&mut self, id: OptionId, value: &str) -> Result<(), ConfigError> {
        match id {
            OptionId::Debug => self.values.debug = parse_bool(id, value)?,
            OptionId::AutoRestart => self.values.auto_restart = parse_bool(id, value)?,
            OptionId::LogDriver => self.values.log_config.driver_type = value.to_string(),
            OptionId::LogOpts => {
                let (key, opt) = parse_log_opt(value)?;
                self.changed_entries.insert((id, key.clone()));
                self.values.log_config.options.insert(key, opt);
            }
            OptionId::DefaultUlimits => {
                let ulimit: Ulimit = value.parse()?;
                self.changed_entries.insert((id, ulimit.name.clone()));
                self.values.ulimits.insert(ulimit.name.clone(), ulimit);
            }
            OptionId::DefaultShmSize => self.values.shm_size = value.parse::<Quantity>()?,
        }
        self.changed.insert(id);
        Ok(())
    }
}

fn parse_bool(id: OptionId, value: &str) -> Result<bool, ConfigError> {
    match value {
        "1" | "t" | "T" | "true" | "True" | "TRUE" => Ok(true),
        "0" | "f" | "F" | "false" | "False" | "FALSE" => Ok(false),
        _ => Err(ConfigError::InvalidFlagValue {
            flag: id.flag_name().to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shm_size() {
        let flags = FlagRegistry::new();
        assert_eq!(flags.config().shm_size.bytes(), 64 * 1024 * 1024);
        assert!(!flags.changed(OptionId::DefaultShmSize));
    }

    #[test]
    fn test_set_shm_size() {
        let mut flags = FlagRegistry::new();
        flags.set("default-shm-size", "128M").unwrap();
        assert_eq!(flags.config().shm_size.bytes(), 128 * 1024 * 1024);
        assert!(flags.changed(OptionId::DefaultShmSize));
    }

    #[test]
    fn test_set_invalid_shm_size_leaves_state_untouched() {
        let mut flags = FlagRegistry::new();
        let result = flags.set("default-shm-size", "lots");
        assert!(matches!(result, Err(ConfigError::InvalidQuantity { .. })));
        assert_eq!(flags.config().shm_size.bytes(), 64 * 1024 * 1024);
        assert!(!flags.changed(OptionId::DefaultShmSize));
    }

    #[test]
    fn test_repeatable_flags_accumulate() {
        let mut flags = FlagRegistry::new();
        flags.set("log-opt", "tag=web").unwrap();
        flags.set("log-opt", "max-size=10m").unwrap();
        flags.set("default-ulimit", "nofile=1024:2048").unwrap();
        flags.set("default-ulimits", "nproc=512").unwrap();

        let config = flags.config();
        assert_eq!(config.log_config.options.len(), 2);
        assert_eq!(config.log_config.options["max-size"], "10m");
        assert_eq!(config.ulimits["nofile"], Ulimit::new("nofile", 1024, 2048));
        assert_eq!(config.ulimits["nproc"], Ulimit::new("nproc", 512, 512));
        assert_eq!(
            flags.changed_options().collect::<Vec<_>>(),
            vec![OptionId::LogOpts, OptionId::DefaultUlimits]
        );
    }

    #[test]
    fn test_bool_flags() {
        let mut flags = FlagRegistry::new();
        flags.set("debug", "true").unwrap();
        flags.set("auto-restart", "0").unwrap();
        assert!(flags.config().debug);
        assert!(!flags.config().auto_restart);
        assert!(flags.changed(OptionId::AutoRestart));

        for (text, expected) in [("t", true), ("TRUE", true), ("F", false), ("False", false)] {
            flags.set("debug", text).unwrap();
            assert_eq!(flags.config().debug, expected, "parsing {text:?}");
        }

        let result = flags.set("debug", "yes");
        assert!(matches!(result, Err(ConfigError::InvalidFlagValue { ref flag, .. }) if flag == "debug"));
    }

    #[test]
    fn test_unknown_flag() {
        let mut flags = FlagRegistry::new();
        assert!(matches!(
            flags.set("log-opts", "tag=x"),
            Err(ConfigError::UnknownFlag(ref name)) if name == "log-opts"
        ));
    }

    #[test]
    fn test_changed_entries_exclude_defaults() {
        let mut defaults = Config::default();
        defaults
            .ulimits
            .insert("nofile".into(), Ulimit::new("nofile", 1, 2));
        defaults.log_config.options.insert("env".into(), "prod".into());

        let mut flags = FlagRegistry::with_defaults(defaults);
        flags.set("default-ulimit", "nproc=5:5").unwrap();
        flags.set("log-opt", "tag=web").unwrap();

        assert!(flags.changed_entry(OptionId::DefaultUlimits, "nproc"));
        assert!(!flags.changed_entry(OptionId::DefaultUlimits, "nofile"));
        assert!(flags.changed_entry(OptionId::LogOpts, "tag"));
        assert!(!flags.changed_entry(OptionId::LogOpts, "env"));
    }

    #[test]
    fn test_with_defaults_starts_unchanged() {
        let mut defaults = Config::default();
        defaults.log_config.driver_type = "syslog".to_string();
        let flags = FlagRegistry::with_defaults(defaults.clone());
        assert_eq!(flags.config(), &defaults);
        assert_eq!(flags.changed_options().count(), 0);
    }
}
