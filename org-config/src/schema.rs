//! Strongly typed configuration schema.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::loader::ConfigError;

/// Default AWS named profile.
pub const DEFAULT_PROFILE: &str = "default";
/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Log verbosity requested for the server process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Diagnostic output, including effective configuration.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Recoverable problems.
    Warning,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Returns the directive understood by `tracing` filters.
    #[must_use]
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warning),
            "ERROR" | "CRITICAL" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidLogLevel {
                value: s.to_owned(),
            }),
        }
    }
}

/// Process-wide service configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    aws_profile: String,
    aws_region: String,
    readonly_mode: bool,
    master_account_only: bool,
    log_level: LogLevel,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            aws_profile: DEFAULT_PROFILE.to_owned(),
            aws_region: DEFAULT_REGION.to_owned(),
            readonly_mode: true,
            master_account_only: true,
            log_level: LogLevel::default(),
        }
    }
}

impl ServiceConfig {
    /// Overrides the AWS named profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.aws_profile = profile.into();
        self
    }

    /// Overrides the AWS region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.aws_region = region.into();
        self
    }

    /// Sets whether mutating operations are refused.
    #[must_use]
    pub fn with_readonly_mode(mut self, readonly: bool) -> Self {
        self.readonly_mode = readonly;
        self
    }

    /// Sets whether directory operations are restricted to the management account.
    #[must_use]
    pub fn with_master_account_only(mut self, enabled: bool) -> Self {
        self.master_account_only = enabled;
        self
    }

    /// Sets the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Returns the AWS named profile.
    #[must_use]
    pub fn aws_profile(&self) -> &str {
        &self.aws_profile
    }

    /// Returns the AWS region.
    #[must_use]
    pub fn aws_region(&self) -> &str {
        &self.aws_region
    }

    /// Returns true when mutating operations must be refused.
    #[must_use]
    pub fn readonly_mode(&self) -> bool {
        self.readonly_mode
    }

    /// Returns true when directory operations require the management account.
    #[must_use]
    pub fn master_account_only(&self) -> bool {
        self.master_account_only
    }

    /// Returns the configured log level.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Returns true when running at DEBUG verbosity or finer.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.log_level <= LogLevel::Debug
    }
}
