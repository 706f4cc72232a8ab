//! JSON-RPC 2.0 message types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
/// JSON-RPC version tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// Line could not be parsed as JSON.
pub const PARSE_ERROR: i64 = -32700;
/// Message is JSON but not a valid request.
pub const INVALID_REQUEST: i64 = -32600;
/// Method is not supported.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Parameters are missing or malformed.
pub const INVALID_PARAMS: i64 = -32602;
/// Server-side failure outside any tool.
pub const INTERNAL_ERROR: i64 = -32603;

/// Notification a client sends to abandon an earlier request.
pub const CANCELLED_NOTIFICATION: &str = "notifications/cancelled";

/// A JSON-RPC 2.0 request or notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be `"2.0"`.
    pub jsonrpc: String,
    /// Method name.
    pub method: String,
    /// Optional parameters.
    #[serde(default)]
    pub params: Option<Value>,
    /// Request id; absent for notifications. An explicit `null` is kept as
    /// `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    /// Returns true when no response is expected.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Returns the `requestId` of a cancellation notification.
    #[must_use]
    pub fn cancelled_request(&self) -> Option<&Value> {
        if self.method != CANCELLED_NOTIFICATION || !self.is_notification() {
            return None;
        }
        self.params.as_ref()?.get("requestId")
    }
}

/// Why a line could not be turned into a [`JsonRpcRequest`].
#[derive(Debug)]
pub enum RequestError {
    /// The line is not JSON.
    Parse(serde_json::Error),
    /// The line is JSON but not a request; carries the id when one was readable.
    Invalid {
        /// Request id, `null` when unreadable.
        id: Value,
        /// Decoder message.
        reason: String,
    },
}

impl RequestError {
    /// Converts the failure into its error response.
    #[must_use]
    pub fn into_response(self) -> JsonRpcResponse {
        match self {
            Self::Parse(_) => JsonRpcResponse::failure(Value::Null, PARSE_ERROR, "Parse error"),
            Self::Invalid { id, reason } => {
                JsonRpcResponse::failure(id, INVALID_REQUEST, format!("Invalid Request: {reason}"))
            }
        }
    }
}

/// Decodes one line: first as JSON, then as a request.
///
/// # Errors
///
/// Returns [`RequestError::Parse`] for malformed JSON and
/// [`RequestError::Invalid`] for JSON that is not a request object.
pub fn parse_request(line: &str) -> Result<JsonRpcRequest, RequestError> {
    let value: Value = serde_json::from_str(line).map_err(RequestError::Parse)?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|err| RequestError::Invalid {
        id,
        reason: err.to_string(),
    })
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Mirrors the request id.
    pub id: Value,
}

impl JsonRpcResponse {
    /// Builds a success response.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Standard or application error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
