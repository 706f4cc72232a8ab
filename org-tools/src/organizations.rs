//! AWS Organizations tool set.

use std::sync::Arc;

use org_access::{OrganizationsAccess, validate_policy_document};
use org_primitives::PolicyType;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::registry::{ToolError, ToolMetadata, ToolRegistry, ToolResult};

/// Greeting tool name.
pub const HELLO: &str = "hello";
/// Health check tool name.
pub const HEALTH_CHECK: &str = "aws_health_check";
/// Policy listing tool name.
pub const LIST_POLICIES: &str = "list_scp_policies";
/// Policy detail tool name.
pub const POLICY_DETAIL: &str = "get_scp_detail";
/// Offline document validation tool name.
pub const VALIDATE_POLICY: &str = "validate_scp_syntax";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HelloArgs {
    #[serde(default = "default_name")]
    name: String,
}

fn default_name() -> String {
    "World".to_owned()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListArgs {
    #[serde(default)]
    filter_type: PolicyType,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetailArgs {
    policy_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ValidateArgs {
    content: String,
}

/// Parses tool arguments; a missing argument object counts as empty.
fn parse_args<T: DeserializeOwned>(tool: &str, input: Value) -> ToolResult<T> {
    let input = match input {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(input).map_err(|err| ToolError::InvalidArguments {
        tool: tool.to_owned(),
        reason: err.to_string(),
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> ToolResult<Value> {
    serde_json::to_value(value).map_err(|err| ToolError::execution(err.to_string()))
}

async fn hello(input: Value) -> ToolResult<Value> {
    let args: HelloArgs = parse_args(HELLO, input)?;
    Ok(Value::String(format!(
        "Hello, {}! AWS Organizations MCP server is running.",
        args.name
    )))
}

async fn health_check(access: Arc<OrganizationsAccess>, input: Value) -> ToolResult<Value> {
    let NoArgs {} = parse_args(HEALTH_CHECK, input)?;
    let report = access.check_health().await;
    debug!(healthy = report.is_healthy(), "health check completed");
    to_json(&report)
}

async fn list_policies(access: Arc<OrganizationsAccess>, input: Value) -> ToolResult<Value> {
    let ListArgs { filter_type } = parse_args(LIST_POLICIES, input)?;
    if !filter_type.is_known() {
        return Err(ToolError::InvalidArguments {
            tool: LIST_POLICIES.to_owned(),
            reason: format!("unsupported filter_type `{filter_type}`"),
        });
    }
    debug!(filter = %filter_type, "listing policies");
    let policies = access.list_policies(filter_type).await?;
    debug!(count = policies.len(), "listed policies");
    Ok(json!({
        "count": policies.len(),
        "policies": policies,
    }))
}

async fn policy_detail(access: Arc<OrganizationsAccess>, input: Value) -> ToolResult<Value> {
    let args: DetailArgs = parse_args(POLICY_DETAIL, input)?;
    let policy_id = args.policy_id.trim();
    if policy_id.is_empty() {
        return Err(ToolError::InvalidArguments {
            tool: POLICY_DETAIL.to_owned(),
            reason: "policy_id cannot be empty".into(),
        });
    }
    let policy = access.get_policy(policy_id).await?;
    to_json(&policy)
}

async fn validate_policy(input: Value) -> ToolResult<Value> {
    let args: ValidateArgs = parse_args(VALIDATE_POLICY, input)?;
    to_json(&validate_policy_document(&args.content))
}

/// Registers every Organizations tool against `access`.
///
/// # Errors
///
/// Returns [`ToolError::DuplicateTool`] when any of the names is already taken.
pub fn register_all(registry: &ToolRegistry, access: Arc<OrganizationsAccess>) -> ToolResult<()> {
    registry.register_tool(
        ToolMetadata::new(HELLO, "Simple greeting to verify the server is reachable.")?
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Name to greet", "default": "World" }
                },
                "additionalProperties": false
            })),
        hello,
    )?;

    let shared = Arc::clone(&access);
    registry.register_tool(
        ToolMetadata::new(
            HEALTH_CHECK,
            "Check AWS credentials, caller identity, and Organizations access.",
        )?
        .with_input_schema(json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })),
        move |input: Value| health_check(Arc::clone(&shared), input),
    )?;

    let shared = Arc::clone(&access);
    registry.register_tool(
        ToolMetadata::new(
            LIST_POLICIES,
            "List organization policies of one type. Requires the management account unless MASTER_ACCOUNT_ONLY=false.",
        )?
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "filter_type": {
                    "type": "string",
                    "enum": PolicyType::ALL.iter().map(PolicyType::as_str).collect::<Vec<_>>(),
                    "default": PolicyType::ServiceControlPolicy.as_str()
                }
            },
            "additionalProperties": false
        })),
        move |input: Value| list_policies(Arc::clone(&shared), input),
    )?;

    registry.register_tool(
        ToolMetadata::new(POLICY_DETAIL, "Fetch one policy, including its document.")?
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "policy_id": { "type": "string", "description": "Policy id, e.g. p-examplepolicyid" }
                },
                "required": ["policy_id"],
                "additionalProperties": false
            })),
        move |input: Value| policy_detail(Arc::clone(&access), input),
    )?;

    registry.register_tool(
        ToolMetadata::new(
            VALIDATE_POLICY,
            "Check the structure of a service control policy document without calling AWS.",
        )?
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "Policy document JSON" }
            },
            "required": ["content"],
            "additionalProperties": false
        })),
        validate_policy,
    )?;

    Ok(())
}
