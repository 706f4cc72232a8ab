use std::sync::Arc;
use std::time::Duration;

use org_access::OrganizationsAccess;
use org_config::ServiceConfig;
use org_primitives::{AccountId, CallerIdentity, OrganizationDescriptor, PolicyDetail, PolicyType};
use org_provider::memory::{StaticIdentity, StaticOrganizations};
use org_server::{McpServer, PROTOCOL_VERSION, ServerInfo};
use org_tools::{ToolRegistry, register_all};
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;

const MASTER: &str = "111111111111";
const MEMBER: &str = "222222222222";

fn account(id: &str) -> AccountId {
    AccountId::new(id).unwrap()
}

fn organization() -> OrganizationDescriptor {
    OrganizationDescriptor::new(
        "o-exampleorgid",
        "arn:aws:organizations::111111111111:organization/o-exampleorgid",
        account(MASTER),
    )
}

fn scp(id: &str, name: &str) -> PolicyDetail {
    PolicyDetail {
        id: id.into(),
        arn: format!("arn:aws:organizations::111111111111:policy/o-exampleorgid/service_control_policy/{id}"),
        name: name.into(),
        description: String::new(),
        content: r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":"*","Resource":"*"}]}"#
            .into(),
        policy_type: PolicyType::ServiceControlPolicy,
        aws_managed: name == "FullAWSAccess",
    }
}

fn caller(id: &str) -> StaticIdentity {
    StaticIdentity::new(CallerIdentity::new(
        account(id),
        format!("arn:aws:iam::{id}:role/Auditor"),
    ))
}

fn server(backend: Arc<StaticOrganizations>, identity: StaticIdentity) -> McpServer {
    let config = ServiceConfig::default();
    let access = OrganizationsAccess::new(&config, backend, Arc::new(identity));
    let registry = ToolRegistry::new().with_read_only(config.readonly_mode());
    register_all(&registry, Arc::new(access)).unwrap();
    McpServer::new(Arc::new(registry), ServerInfo::for_config(&config))
}

async fn exchange(server: &McpServer, requests: &[&str]) -> Vec<Value> {
    let input: String = requests.iter().map(|line| format!("{line}\n")).collect();
    let (mut client, server_end) = tokio::io::duplex(1 << 20);

    server.run(input.as_bytes(), server_end).await.unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn by_id(responses: &[Value], id: i64) -> &Value {
    responses
        .iter()
        .find(|response| response["id"] == id)
        .unwrap_or_else(|| panic!("no response with id {id} in {responses:?}"))
}

fn call(id: i64, name: &str, arguments: &Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments },
    })
    .to_string()
}

fn tool_body(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn handshake_and_listing() {
    let server = server(
        Arc::new(StaticOrganizations::with_organization(organization())),
        caller(MASTER),
    );

    let responses = exchange(
        &server,
        &[
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        ],
    )
    .await;

    assert_eq!(responses.len(), 2);

    let init = &by_id(&responses, 1)["result"];
    assert_eq!(init["protocolVersion"], PROTOCOL_VERSION);
    assert_eq!(init["serverInfo"]["name"], "AWS Organizations MCP Server");
    assert!(init["capabilities"]["tools"].is_object());

    let tools = by_id(&responses, 2)["result"]["tools"].as_array().unwrap();
    let names: Vec<_> = tools.iter().map(|tool| tool["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        [
            "aws_health_check",
            "get_scp_detail",
            "hello",
            "list_scp_policies",
            "validate_scp_syntax"
        ]
    );
    assert!(tools.iter().all(|tool| tool["inputSchema"]["type"] == "object"));
}

#[tokio::test]
async fn master_account_lists_policies() {
    let server = server(
        Arc::new(
            StaticOrganizations::with_organization(organization())
                .with_policy(scp("p-FullAWSAccess", "FullAWSAccess"))
                .with_policy(scp("p-aaaaaaaa", "DenyLeave")),
        ),
        caller(MASTER),
    );

    let responses = exchange(&server, &[&call(1, "list_scp_policies", &json!({}))]).await;

    let response = by_id(&responses, 1);
    assert_eq!(response["result"]["isError"], false);
    let body = tool_body(response);
    assert_eq!(body["count"], 2);
    assert_eq!(body["policies"][0]["name"], "FullAWSAccess");
    assert_eq!(body["policies"][0]["aws_managed"], true);
    assert_eq!(body["policies"][1]["id"], "p-aaaaaaaa");
}

#[tokio::test]
async fn member_account_is_refused_without_listing() {
    let backend = Arc::new(
        StaticOrganizations::with_organization(organization())
            .with_policy(scp("p-aaaaaaaa", "DenyLeave")),
    );
    let server = server(Arc::clone(&backend), caller(MEMBER));

    let responses = exchange(&server, &[&call(1, "list_scp_policies", &json!({}))]).await;

    let response = by_id(&responses, 1);
    assert_eq!(response["result"]["isError"], true);
    let body = tool_body(response);
    assert_eq!(body["error"], "authorization_error");
    assert!(body["message"].as_str().unwrap().contains("not_master_account"));
    assert_eq!(backend.page_calls(), 0);
}

#[tokio::test]
async fn health_without_organization_is_healthy() {
    let server = server(Arc::new(StaticOrganizations::new()), caller(MASTER));

    let responses = exchange(&server, &[&call(1, "aws_health_check", &json!({}))]).await;

    let body = tool_body(by_id(&responses, 1));
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["organizations"]["status"], "not_in_use");
    assert_eq!(body["organizations"]["is_master_account"], false);
    assert_eq!(body["profile"], "default");
    assert_eq!(body["region"], "us-east-1");
}

#[tokio::test]
async fn health_without_credentials_is_unhealthy() {
    let server = server(
        Arc::new(StaticOrganizations::with_organization(organization())),
        StaticIdentity::missing(),
    );

    let responses = exchange(&server, &[&call(1, "aws_health_check", &json!({}))]).await;

    let response = by_id(&responses, 1);
    assert_eq!(response["result"]["isError"], false);
    let body = tool_body(response);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["kind"], "no_credentials");
    assert!(body["suggestion"].as_str().unwrap().contains("AWS_PROFILE"));
}

#[tokio::test]
async fn protocol_errors_do_not_stop_the_loop() {
    let server = server(
        Arc::new(StaticOrganizations::with_organization(organization())),
        caller(MASTER),
    );

    let responses = exchange(
        &server,
        &[
            "this is not json",
            r#"{"jsonrpc":"2.0","id":1,"method":"prompts/list"}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{}}"#,
            &call(3, "delete_everything", &json!({})),
            &call(4, "get_scp_detail", &json!({ "policy_id": "p-missing" })),
            &call(5, "hello", &json!({ "name": "Auditor" })),
        ],
    )
    .await;

    assert_eq!(responses.len(), 6);

    let parse = responses
        .iter()
        .find(|response| response["id"].is_null())
        .unwrap();
    assert_eq!(parse["error"]["code"], -32700);
    assert_eq!(by_id(&responses, 1)["error"]["code"], -32601);
    assert_eq!(by_id(&responses, 2)["error"]["code"], -32602);
    assert_eq!(by_id(&responses, 3)["error"]["code"], -32602);

    let missing = by_id(&responses, 4);
    assert_eq!(missing["result"]["isError"], true);
    assert_eq!(tool_body(missing)["error"], "policy_not_found");

    assert_eq!(
        by_id(&responses, 5)["result"]["content"][0]["text"],
        "Hello, Auditor! AWS Organizations MCP server is running."
    );
}

#[tokio::test]
async fn cancelled_call_is_abandoned_without_response() {
    let backend = Arc::new(
        StaticOrganizations::with_organization(organization())
            .with_policy(scp("p-aaaaaaaa", "DenyLeave"))
            .with_latency(Duration::from_millis(200)),
    );
    let server = server(Arc::clone(&backend), caller(MASTER));

    let responses = exchange(
        &server,
        &[
            &call(1, "list_scp_policies", &json!({})),
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":1,"reason":"user"}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":99}}"#,
            &call(2, "list_scp_policies", &json!({})),
        ],
    )
    .await;

    assert_eq!(responses.len(), 1, "{responses:?}");
    let body = tool_body(by_id(&responses, 2));
    assert_eq!(body["count"], 1);
    assert_eq!(backend.page_calls(), 1);
}

#[tokio::test]
async fn null_id_and_missing_method_are_answered() {
    let server = server(Arc::new(StaticOrganizations::new()), caller(MASTER));

    let responses = exchange(
        &server,
        &[
            r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#,
            r#"{"jsonrpc":"2.0","id":7}"#,
        ],
    )
    .await;

    assert_eq!(responses.len(), 2);
    let ping = responses.iter().find(|r| r["id"].is_null()).unwrap();
    assert_eq!(ping["result"], json!({}));
    assert_eq!(by_id(&responses, 7)["error"]["code"], -32600);
}

#[tokio::test]
async fn empty_input_ends_cleanly() {
    let server = server(Arc::new(StaticOrganizations::new()), caller(MASTER));
    assert!(exchange(&server, &[]).await.is_empty());
}
