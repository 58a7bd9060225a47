//! Semantic checks on a merged configuration.

use super::option::OptionId;
use super::types::Config;
use super::ConfigError;

/// Checks a configuration, stopping at the first problem found.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.shm_size.bytes() < 0 {
        return Err(invalid(
            OptionId::DefaultShmSize.file_key(),
            format!("size must not be negative, got {}", config.shm_size.bytes()),
        ));
    }

    for (key, ulimit) in &config.ulimits {
        let field = format!("{}.{key}", OptionId::DefaultUlimits.file_key());
        if ulimit.name.is_empty() {
            return Err(invalid(field, "ulimit name must not be empty"));
        }
        if ulimit.soft < 0 || ulimit.hard < 0 {
            return Err(invalid(field, "limits must not be negative"));
        }
        if ulimit.soft > ulimit.hard {
            return Err(invalid(
                field,
                format!(
                    "soft limit {} is greater than hard limit {}",
                    ulimit.soft, ulimit.hard
                ),
            ));
        }
    }

    if !config.log_config.options.is_empty() && config.log_config.driver_type.is_empty() {
        return Err(invalid(
            OptionId::LogDriver.file_key(),
            "log options were given but no log driver is set",
        ));
    }

    Ok(())
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Quantity, Ulimit};

    fn field_of(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::Validation { field, .. }) => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_negative_shm_size() {
        let mut config = Config::default();
        config.shm_size = Quantity::from_bytes(-1);
        assert_eq!(field_of(validate(&config)), "default-shm-size");
    }

    #[test]
    fn test_ulimit_soft_above_hard() {
        let mut config = Config::default();
        config
            .ulimits
            .insert("nofile".into(), Ulimit::new("nofile", 4096, 1024));
        assert_eq!(field_of(validate(&config)), "default-ulimits.nofile");
    }

    #[test]
    fn test_ulimit_negative() {
        let mut config = Config::default();
        config.ulimits.insert("core".into(), Ulimit::new("core", -1, 0));
        assert_eq!(field_of(validate(&config)), "default-ulimits.core");
    }

    #[test]
    fn test_log_options_need_a_driver() {
        let mut config = Config::default();
        config.log_config.driver_type.clear();
        assert!(validate(&config).is_ok());

        config.log_config.options.insert("tag".into(), "x".into());
        assert_eq!(field_of(validate(&config)), "log-driver");
    }

    #[test]
    fn test_fails_on_first_violation() {
        let mut config = Config::default();
        config.shm_size = Quantity::from_bytes(-1);
        config.ulimits.insert("nofile".into(), Ulimit::new("nofile", 2, 1));
        assert_eq!(field_of(validate(&config)), "default-shm-size");
    }
}
