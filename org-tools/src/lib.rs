//! Tool registration and invocation for the MCP surface.
//!
//! [`registry`] holds tool metadata and executors and enforces read-only
//! mode; [`organizations`] binds the Organizations access layer to named
//! tools.

#![warn(missing_docs, clippy::pedantic)]

pub mod organizations;
pub mod registry;

pub use organizations::register_all;
pub use registry::{Tool, ToolError, ToolHandle, ToolMetadata, ToolRegistry, ToolResult};
