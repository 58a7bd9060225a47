//! The daemon's active configuration and how it is reloaded.

use std::path::{Path, PathBuf};

use crate::config::{validate, Config, FlagRegistry, Merger};
use crate::Error;

/// Holds the active configuration together with the flags and file it was
/// built from, so it can be rebuilt on reload.
///
/// ## Example
///
/// ```no_run
/// use daemon_config::{DaemonContext, FlagRegistry};
///
/// let mut ctx = DaemonContext::builder(FlagRegistry::new())
///     .with_file("/etc/daemon/daemon.json")
///     .build()?;
///
/// let shm = ctx.config().shm_size;
/// if ctx.reload()? {
///     println!("shm size was {shm}, now {}", ctx.config().shm_size);
/// }
/// # Ok::<(), daemon_config::Error>(())
/// ```
#[derive(Debug)]
pub struct DaemonContext {
    registry: FlagRegistry,
    file: Option<PathBuf>,
    strict: bool,
    config: Config,
}

impl DaemonContext {
    /// Creates a builder. The registry's values serve as the base the file is
    /// merged over.
    pub fn builder(registry: FlagRegistry) -> DaemonContextBuilder {
        DaemonContextBuilder {
            registry,
            file: None,
            strict: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &FlagRegistry {
        &self.registry
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Re-reads the configuration file and swaps in the result.
    ///
    /// Returns whether the active configuration changed. On error the active
    /// configuration is kept.
    pub fn reload(&mut self) -> Result<bool, Error> {
        let config = merge(&self.registry, self.file.as_deref(), self.strict)?;
        let changed = config != self.config;
        if changed {
            tracing::info!("configuration reloaded");
            self.config = config;
        } else {
            tracing::debug!("configuration unchanged after reload");
        }
        Ok(changed)
    }
}

/// Builder for a [`DaemonContext`].
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct DaemonContextBuilder {
    registry: FlagRegistry,
    file: Option<PathBuf>,
    strict: bool,
}

impl DaemonContextBuilder {
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Merges and validates the initial configuration.
    pub fn build(self) -> Result<DaemonContext, Error> {
        let config = merge(&self.registry, self.file.as_deref(), self.strict)?;
        Ok(DaemonContext {
            registry: self.registry,
            file: self.file,
            strict: self.strict,
            config,
        })
    }
}

fn merge(registry: &FlagRegistry, file: Option<&Path>, strict: bool) -> Result<Config, Error> {
    let mut merger = Merger::new(registry).strict(strict);
    if let Some(path) = file {
        merger = merger.with_file(path);
    }
    let config = merger.merge(registry.config())?;
    // The merger skips validation when there is no file.
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_without_file_uses_flags() {
        let mut flags = FlagRegistry::new();
        flags.set("debug", "true").unwrap();

        let ctx = DaemonContext::builder(flags).build().unwrap();

        assert!(ctx.config().debug);
        assert_eq!(ctx.config_file(), None);
    }

    #[test]
    fn test_build_validates_flags_without_file() {
        let mut flags = FlagRegistry::new();
        flags.set("default-ulimit", "nofile=10:5").unwrap();

        let result = DaemonContext::builder(flags).build();

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::Validation { .. }))
        ));
    }

    #[test]
    fn test_reload_swaps_config() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{"debug": false}"#).unwrap();

        let mut ctx = DaemonContext::builder(FlagRegistry::new())
            .with_file(file.path())
            .build()
            .unwrap();
        assert!(!ctx.config().debug);
        assert!(!ctx.reload().unwrap());

        fs::write(file.path(), r#"{"debug": true, "default-shm-size": "1g"}"#).unwrap();
        assert!(ctx.reload().unwrap());
        assert!(ctx.config().debug);
        assert_eq!(ctx.config().shm_size.bytes(), 1024 * 1024 * 1024);
    }

    #[test]
    fn test_failed_reload_keeps_config() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{"log-opts": {"tag": "web"}}"#).unwrap();

        let mut ctx = DaemonContext::builder(FlagRegistry::new())
            .with_file(file.path())
            .build()
            .unwrap();
        let before = ctx.config().clone();

        fs::write(file.path(), "{ broken").unwrap();
        assert!(matches!(
            ctx.reload(),
            Err(Error::Config(ConfigError::Parse { .. }))
        ));
        assert_eq!(ctx.config(), &before);
    }

    #[test]
    fn test_reload_drops_removed_file_entries() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{"log-opts": {"tag": "web"}}"#).unwrap();

        let mut ctx = DaemonContext::builder(FlagRegistry::new())
            .with_file(file.path())
            .build()
            .unwrap();
        assert_eq!(ctx.config().log_config.options["tag"], "web");

        fs::write(file.path(), "{}").unwrap();
        assert!(ctx.reload().unwrap());
        assert!(ctx.config().log_config.options.is_empty());
    }
}
