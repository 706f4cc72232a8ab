//! Runtime registry for tool metadata and execution.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use org_access::AccessError;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Metadata describing a registered tool.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ToolMetadata {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
    #[serde(skip)]
    mutating: bool,
}

impl ToolMetadata {
    /// Creates metadata for a read-only tool accepting no arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidMetadata`] if the name is empty.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> ToolResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ToolError::InvalidMetadata {
                reason: "tool name cannot be empty".into(),
            });
        }

        Ok(Self {
            name,
            description: description.into(),
            input_schema: json!({ "type": "object", "properties": {} }),
            mutating: false,
        })
    }

    /// Sets the JSON schema advertised for the tool arguments.
    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Marks the tool as performing mutating provider calls.
    #[must_use]
    pub fn mutating(mut self) -> Self {
        self.mutating = true;
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the argument schema.
    #[must_use]
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns true when the tool mutates provider state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        self.mutating
    }
}

/// Trait implemented by tool executors.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Invokes the tool with the given JSON arguments, returning JSON output.
    async fn invoke(&self, input: Value) -> ToolResult<Value>;
}

#[async_trait]
impl<F, Fut> Tool for F
where
    F: Send + Sync + Fn(Value) -> Fut,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    async fn invoke(&self, input: Value) -> ToolResult<Value> {
        (self)(input).await
    }
}

/// Handle returned by the registry for direct invocation.
#[derive(Clone)]
pub struct ToolHandle {
    metadata: ToolMetadata,
    executor: Arc<dyn Tool>,
}

impl std::fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHandle")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl ToolHandle {
    /// Returns the associated metadata.
    #[must_use]
    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    /// Executes the underlying tool implementation.
    ///
    /// # Errors
    ///
    /// Propagates whatever the implementation returns.
    pub async fn invoke(&self, input: Value) -> ToolResult<Value> {
        self.executor.invoke(input).await
    }
}

/// Registry that stores tool implementations keyed by name.
///
/// Read-only unless built with [`ToolRegistry::with_read_only`]`(false)`;
/// while read-only, tools flagged as mutating are refused.
pub struct ToolRegistry {
    inner: RwLock<BTreeMap<String, ToolHandle>>,
    read_only: bool,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            read_only: true,
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self
            .inner
            .read()
            .map(|inner| inner.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("ToolRegistry")
            .field("registered", &names)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty read-only registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether mutating tools are refused.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Returns true when mutating tools are refused.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Registers a tool implementation.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register_tool<T>(&self, metadata: ToolMetadata, tool: T) -> ToolResult<()>
    where
        T: Tool + 'static,
    {
        let mut inner = self.inner.write().expect("tool registry poisoned");
        let name = metadata.name().to_owned();
        if inner.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }

        debug!(tool = %name, mutating = metadata.is_mutating(), "registered tool");
        inner.insert(
            name,
            ToolHandle {
                metadata,
                executor: Arc::new(tool),
            },
        );

        Ok(())
    }

    /// Returns a handle to the tool matching the supplied name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ToolHandle> {
        let inner = self.inner.read().ok()?;
        inner.get(name).cloned()
    }

    /// Invokes a registered tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when the tool is not found,
    /// [`ToolError::ReadOnly`] for a mutating tool in read-only mode, and
    /// otherwise whatever the implementation returns.
    pub async fn invoke(&self, name: &str, input: Value) -> ToolResult<Value> {
        let handle = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_owned(),
        })?;

        if self.read_only && handle.metadata.is_mutating() {
            warn!(tool = name, "refused mutating tool in read-only mode");
            return Err(ToolError::ReadOnly {
                name: name.to_owned(),
            });
        }

        debug!(tool = name, "invoking tool");
        handle.invoke(input).await
    }

    /// Lists the metadata of all registered tools, sorted by name.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn list(&self) -> Vec<ToolMetadata> {
        let inner = self.inner.read().expect("tool registry poisoned");
        inner
            .values()
            .map(|handle| handle.metadata.clone())
            .collect()
    }
}

/// Errors produced by tool registration and invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool metadata failed validation.
    #[error("invalid tool metadata: {reason}")]
    InvalidMetadata {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool name collided with an existing registration.
    #[error("tool `{name}` is already registered")]
    DuplicateTool {
        /// Name of the offending tool.
        name: String,
    },

    /// Requested tool does not exist.
    #[error("tool `{name}` is not registered")]
    UnknownTool {
        /// Name of the missing tool.
        name: String,
    },

    /// Arguments did not match the tool's schema.
    #[error("invalid arguments for `{tool}`: {reason}")]
    InvalidArguments {
        /// Tool that rejected the arguments.
        tool: String,
        /// Deserializer message.
        reason: String,
    },

    /// A mutating tool was called while the server is read-only.
    #[error("tool `{name}` modifies the organization and the server is in read-only mode")]
    ReadOnly {
        /// Name of the refused tool.
        name: String,
    },

    /// The access layer reported a classified failure.
    #[error("{message}")]
    Failed {
        /// Stable snake_case error kind.
        kind: &'static str,
        /// Human-readable description.
        message: String,
        /// Remediation hint, when one applies.
        hint: Option<&'static str>,
    },

    /// Tool execution failed unexpectedly.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Returns the stable snake_case kind reported to clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidMetadata { .. } | Self::Execution { .. } => "internal_error",
            Self::DuplicateTool { .. } => "duplicate_tool",
            Self::UnknownTool { .. } => "unknown_tool",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::ReadOnly { .. } => "read_only",
            Self::Failed { kind, .. } => *kind,
        }
    }

    /// Renders the error as the JSON body returned to clients.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let Self::Failed {
            hint: Some(hint), ..
        } = self
        {
            payload["hint"] = Value::from(*hint);
        }
        payload
    }
}

impl From<AccessError> for ToolError {
    fn from(err: AccessError) -> Self {
        Self::Failed {
            kind: err.kind(),
            message: err.to_string(),
            hint: err.hint(),
        }
    }
}
