//! Environment configuration loader.

use std::env;

use thiserror::Error;

use crate::schema::{DEFAULT_PROFILE, DEFAULT_REGION, LogLevel, ServiceConfig};

/// Named AWS profile used to resolve credentials.
pub const AWS_PROFILE_ENV: &str = "AWS_PROFILE";
/// Region the provider clients are pinned to.
pub const AWS_REGION_ENV: &str = "AWS_REGION";
/// Log verbosity.
pub const LOG_LEVEL_ENV: &str = "FASTMCP_LOG_LEVEL";
/// Enables mutating operations when truthy.
pub const ALLOW_WRITE_ENV: &str = "ALLOW_WRITE";
/// Restricts directory operations to the management account when truthy.
pub const MASTER_ACCOUNT_ONLY_ENV: &str = "MASTER_ACCOUNT_ONLY";

/// Errors raised while loading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A boolean flag held a value that is neither truthy nor falsy.
    #[error("invalid value `{value}` for {key}: expected true/false, yes/no, on/off, or 1/0")]
    InvalidFlag {
        /// Environment variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
    /// The log level was not recognised.
    #[error("invalid log level `{value}`")]
    InvalidLogLevel {
        /// Offending value.
        value: String,
    },
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ServiceConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a flag or the log level is malformed.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// Unset or empty values fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a flag or the log level is malformed.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let profile = read(AWS_PROFILE_ENV).unwrap_or_else(|| DEFAULT_PROFILE.to_owned());
        let region = read(AWS_REGION_ENV).unwrap_or_else(|| DEFAULT_REGION.to_owned());
        let log_level = read(LOG_LEVEL_ENV)
            .map(|value| value.parse::<LogLevel>())
            .transpose()?
            .unwrap_or_default();
        let allow_write = read(ALLOW_WRITE_ENV)
            .map(|value| parse_flag(ALLOW_WRITE_ENV, &value))
            .transpose()?
            .unwrap_or(false);
        let master_account_only = read(MASTER_ACCOUNT_ONLY_ENV)
            .map(|value| parse_flag(MASTER_ACCOUNT_ONLY_ENV, &value))
            .transpose()?
            .unwrap_or(true);

        Ok(Self::default()
            .with_profile(profile)
            .with_region(region)
            .with_log_level(log_level)
            .with_readonly_mode(!allow_write)
            .with_master_account_only(master_account_only))
    }
}

fn parse_flag(key: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key,
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> ConfigResult<ServiceConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = load(&[
            ("AWS_PROFILE", "org-admin"),
            ("AWS_REGION", "eu-west-1"),
            ("FASTMCP_LOG_LEVEL", "debug"),
            ("ALLOW_WRITE", "true"),
            ("MASTER_ACCOUNT_ONLY", "false"),
        ])
        .unwrap();

        assert_eq!(config.aws_profile(), "org-admin");
        assert_eq!(config.aws_region(), "eu-west-1");
        assert_eq!(config.log_level(), LogLevel::Debug);
        assert!(!config.readonly_mode());
        assert!(!config.master_account_only());
    }

    #[test]
    fn falsy_strings_are_honoured() {
        let config = load(&[("ALLOW_WRITE", "false"), ("MASTER_ACCOUNT_ONLY", "0")]).unwrap();
        assert!(config.readonly_mode());
        assert!(!config.master_account_only());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("AWS_PROFILE", "  "), ("MASTER_ACCOUNT_ONLY", "")]).unwrap();
        assert_eq!(config.aws_profile(), "default");
        assert!(config.master_account_only());
    }

    #[test]
    fn malformed_flag_is_rejected() {
        let err = load(&[("ALLOW_WRITE", "maybe")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidFlag {
                key: ALLOW_WRITE_ENV,
                value: "maybe".into(),
            }
        );
    }
}
