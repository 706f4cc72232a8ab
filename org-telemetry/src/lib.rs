//! Observability setup for the server process.
//!
//! Standard output carries the protocol stream, so every log line is written
//! to standard error.

#![warn(missing_docs, clippy::pedantic)]

use org_config::LogLevel;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured log level with a full
/// filter directive.
pub const FILTER_ENV: &str = "RUST_LOG";

/// Result alias for telemetry setup.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// Directive that was rejected.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("tracing subscriber already initialised")]
    AlreadyInitialised,
}

/// Picks the filter directive: an explicit `RUST_LOG` value wins over `level`.
#[must_use]
pub fn filter_directive(override_directive: Option<&str>, level: LogLevel) -> String {
    match override_directive.map(str::trim) {
        Some(directive) if !directive.is_empty() => directive.to_owned(),
        _ => level.as_filter().to_owned(),
    }
}

/// Builds the filter for `level`, honouring `RUST_LOG` when set.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the directive does not parse.
pub fn build_filter(level: LogLevel) -> TelemetryResult<EnvFilter> {
    let from_env = std::env::var(FILTER_ENV).ok();
    let directive = filter_directive(from_env.as_deref(), level);
    EnvFilter::try_new(&directive).map_err(|err| TelemetryError::InvalidFilter {
        reason: err.to_string(),
        directive,
    })
}

/// Installs the global `tracing` subscriber writing to standard error.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a malformed `RUST_LOG`, and
/// [`TelemetryError::AlreadyInitialised`] when called twice.
pub fn init(level: LogLevel) -> TelemetryResult<()> {
    let filter = build_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInitialised)?;

    tracing::debug!(%level, "telemetry initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_used_without_override() {
        assert_eq!(filter_directive(None, LogLevel::Warning), "warn");
        assert_eq!(filter_directive(Some("  "), LogLevel::Debug), "debug");
    }

    #[test]
    fn override_wins() {
        assert_eq!(
            filter_directive(Some("org_server=trace,info"), LogLevel::Error),
            "org_server=trace,info"
        );
    }

    #[test]
    fn second_init_is_rejected() {
        // The first call may lose to another test; the second never wins.
        let _ = init(LogLevel::Info);
        assert!(matches!(
            init(LogLevel::Info),
            Err(TelemetryError::AlreadyInitialised)
        ));
    }
}
