//! Configuration management for the Organizations MCP server.
//!
//! Settings are read once from the process environment at start-up and then
//! shared read-only by every component.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{
    ALLOW_WRITE_ENV, AWS_PROFILE_ENV, AWS_REGION_ENV, ConfigError, ConfigResult, LOG_LEVEL_ENV,
    MASTER_ACCOUNT_ONLY_ENV,
};
pub use schema::{LogLevel, ServiceConfig};
