use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::file::{self, RawFileConfig};
use super::flags::FlagRegistry;
use super::option::OptionId;
use super::quantity::Quantity;
use super::types::{Config, Ulimit};
use super::validate::validate;
use super::ConfigError;

/// Merges command-line flags with an optional configuration file.
///
/// Precedence, per option:
///
/// 1. a flag the caller set explicitly,
/// 2. the value from the configuration file,
/// 3. the value already in the base configuration.
///
/// Setting a flag explicitly *and* giving it a different value in the file is
/// an error rather than a silent override. Map options (`log-opts`,
/// `default-ulimits`) merge entry by entry, so entries the file does not
/// mention keep their flag or default value.
///
/// ## Example
///
/// ```no_run
/// use daemon_config::config::{FlagRegistry, Merger};
///
/// let mut flags = FlagRegistry::new();
/// flags.set("debug", "true")?;
///
/// let config = Merger::new(&flags)
///     .with_file("/etc/daemon/daemon.json")
///     .strict(true)
///     .merge(flags.config())?;
/// # Ok::<(), daemon_config::ConfigError>(())
/// ```
#[derive(Debug)]
#[must_use = "mergers do nothing until .merge() is called"]
pub struct Merger<'a> {
    registry: &'a FlagRegistry,
    file: Option<PathBuf>,
    strict: bool,
}

impl<'a> Merger<'a> {
    pub fn new(registry: &'a FlagRegistry) -> Self {
        Self {
            registry,
            file: None,
            strict: false,
        }
    }

    /// Sets the configuration file to merge. An empty path means no file.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Rejects files containing keys that are not known options.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Produces the merged configuration. `base` is left untouched.
    ///
    /// Without a file, `base` is returned as is.
    pub fn merge(&self, base: &Config) -> Result<Config, ConfigError> {
        let Some(path) = self.file.as_deref().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(base.clone());
        };

        let raw = file::load(path)?;
        if !raw.unrecognized.is_empty() {
            if self.strict {
                return Err(ConfigError::UnknownKeys(raw.unrecognized));
            }
            tracing::warn!(
                path = %path.display(),
                keys = ?raw.unrecognized,
                "ignoring unknown keys in configuration file"
            );
        }

        let from_file = FileValues::decode(&raw)?;
        check_conflicts(self.registry, &from_file)?;

        let merged = resolve(base, self.registry, from_file);
        validate(&merged)?;
        Ok(merged)
    }
}

/// Merges `base`, the flags in `registry`, and the file at `file`.
///
/// Shorthand for [`Merger`] without strict mode.
pub fn merge_configurations(
    base: &Config,
    registry: &FlagRegistry,
    file: Option<&Path>,
) -> Result<Config, ConfigError> {
    match file {
        Some(path) => Merger::new(registry).with_file(path).merge(base),
        None => Merger::new(registry).merge(base),
    }
}

/// File values converted to their option types. `None` or an empty map means
/// the file does not mention the option.
#[derive(Debug, Default)]
struct FileValues {
    debug: Option<bool>,
    auto_restart: Option<bool>,
    log_driver: Option<String>,
    log_opts: BTreeMap<String, String>,
    ulimits: BTreeMap<String, Ulimit>,
    shm_size: Option<Quantity>,
}

impl FileValues {
    fn decode(raw: &RawFileConfig) -> Result<Self, ConfigError> {
        let mut values = Self::default();

        for (&id, value) in &raw.values {
            match id {
                OptionId::Debug => values.debug = Some(decode(id, value)?),
                OptionId::AutoRestart => values.auto_restart = Some(decode(id, value)?),
                OptionId::LogDriver => values.log_driver = Some(decode(id, value)?),
                OptionId::LogOpts => values.log_opts = decode(id, value)?,
                OptionId::DefaultUlimits => values.ulimits = decode_ulimits(value)?,
                OptionId::DefaultShmSize => {
                    let size: Quantity = match value {
                        Value::String(text) => text.parse()?,
                        other => decode(id, other)?,
                    };
                    values.shm_size = Some(size);
                }
            }
        }

        Ok(values)
    }
}

fn decode<T: DeserializeOwned>(id: OptionId, value: &Value) -> Result<T, ConfigError> {
    T::deserialize(value).map_err(|e| ConfigError::InvalidValue {
        key: id.file_key().to_string(),
        reason: format!("{e} (found {})", file::type_name(value)),
    })
}

/// Decodes `default-ulimits`, naming each limit after its key when the file
/// leaves `Name` out.
fn decode_ulimits(value: &Value) -> Result<BTreeMap<String, Ulimit>, ConfigError> {
    let mut ulimits: BTreeMap<String, Ulimit> = decode(OptionId::DefaultUlimits, value)?;

    for (key, ulimit) in &mut ulimits {
        if ulimit.name.is_empty() {
            ulimit.name = key.clone();
        } else if ulimit.name != *key {
            return Err(ConfigError::InvalidValue {
                key: format!("{}.{key}", OptionId::DefaultUlimits.file_key()),
                reason: format!("name '{}' does not match its key", ulimit.name),
            });
        }
    }

    Ok(ulimits)
}

/// Fails on the first explicitly set flag whose value the file contradicts.
///
/// Equal values are not a conflict. Map options are compared entry by entry.
fn check_conflicts(registry: &FlagRegistry, from_file: &FileValues) -> Result<(), ConfigError> {
    let flags = registry.config();

    for id in OptionId::ALL.into_iter().filter(|&id| registry.changed(id)) {
        match id {
            OptionId::Debug => scalar_conflict(id, &flags.debug, from_file.debug.as_ref())?,
            OptionId::AutoRestart => {
                scalar_conflict(id, &flags.auto_restart, from_file.auto_restart.as_ref())?
            }
            OptionId::LogDriver => scalar_conflict(
                id,
                &flags.log_config.driver_type,
                from_file.log_driver.as_ref(),
            )?,
            OptionId::LogOpts => {
                map_conflict(registry, id, &flags.log_config.options, &from_file.log_opts)?
            }
            OptionId::DefaultUlimits => {
                map_conflict(registry, id, &flags.ulimits, &from_file.ulimits)?
            }
            OptionId::DefaultShmSize => {
                scalar_conflict(id, &flags.shm_size, from_file.shm_size.as_ref())?
            }
        }
    }

    Ok(())
}

fn scalar_conflict<T: PartialEq + Display>(
    id: OptionId,
    flag: &T,
    file: Option<&T>,
) -> Result<(), ConfigError> {
    match file {
        Some(file) if file != flag => Err(ConfigError::Conflict {
            key: id.file_key().to_string(),
            flag_value: flag.to_string(),
            file_value: file.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Only entries given on the command line are compared; registry defaults
/// are free to be overridden by the file.
fn map_conflict<V: PartialEq + Display>(
    registry: &FlagRegistry,
    id: OptionId,
    flag: &BTreeMap<String, V>,
    file: &BTreeMap<String, V>,
) -> Result<(), ConfigError> {
    for (key, file_value) in file {
        if !registry.changed_entry(id, key) {
            continue;
        }
        if let Some(flag_value) = flag.get(key) {
            if flag_value != file_value {
                return Err(ConfigError::Conflict {
                    key: format!("{}.{key}", id.file_key()),
                    flag_value: flag_value.to_string(),
                    file_value: file_value.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn resolve(base: &Config, registry: &FlagRegistry, from_file: FileValues) -> Config {
    let flags = registry.config();

    let mut log_config = base.log_config.clone();
    log_config.driver_type = pick(
        registry,
        OptionId::LogDriver,
        &flags.log_config.driver_type,
        from_file.log_driver,
        &base.log_config.driver_type,
    );
    log_config.options = overlay(
        registry,
        OptionId::LogOpts,
        &base.log_config.options,
        from_file.log_opts,
        &flags.log_config.options,
    );

    Config {
        debug: pick(registry, OptionId::Debug, &flags.debug, from_file.debug, &base.debug),
        auto_restart: pick(
            registry,
            OptionId::AutoRestart,
            &flags.auto_restart,
            from_file.auto_restart,
            &base.auto_restart,
        ),
        log_config,
        ulimits: overlay(
            registry,
            OptionId::DefaultUlimits,
            &base.ulimits,
            from_file.ulimits,
            &flags.ulimits,
        ),
        shm_size: pick(
            registry,
            OptionId::DefaultShmSize,
            &flags.shm_size,
            from_file.shm_size,
            &base.shm_size,
        ),
    }
}

fn pick<T: Clone>(
    registry: &FlagRegistry,
    id: OptionId,
    flag: &T,
    file: Option<T>,
    base: &T,
) -> T {
    if registry.changed(id) {
        tracing::debug!(option = %id, "using value from flag");
        flag.clone()
    } else if let Some(value) = file {
        tracing::debug!(option = %id, "using value from configuration file");
        value
    } else {
        base.clone()
    }
}

/// Layers file entries, then entries given on the command line, over `base`.
fn overlay<V: Clone>(
    registry: &FlagRegistry,
    id: OptionId,
    base: &BTreeMap<String, V>,
    file: BTreeMap<String, V>,
    flag: &BTreeMap<String, V>,
) -> BTreeMap<String, V> {
    let mut merged = base.clone();
    if !file.is_empty() {
        tracing::debug!(option = %id, entries = file.len(), "merging entries from configuration file");
    }
    merged.extend(file);
    merged.extend(
        flag.iter()
            .filter(|(k, _)| registry.changed_entry(id, k))
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    merged
}
