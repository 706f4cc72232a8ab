//! MCP dispatch shell for the AWS Organizations tool set.
//!
//! This crate carries the stdio JSON-RPC loop, the protocol types it speaks,
//! and the scheduler that isolates each tool call on its own task.

#![warn(missing_docs, clippy::pedantic)]

pub mod protocol;
mod scheduler;
mod server;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
pub use scheduler::{CallScheduler, SchedulerConfig, SchedulerError, SchedulerResult};
pub use server::{McpServer, SERVER_NAME, ServerError, ServerInfo, ServerResult};
