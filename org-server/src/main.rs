//! `aws-orgs-mcp`: MCP server for read-only AWS Organizations and SCP inspection.

use std::sync::Arc;

use anyhow::{Context, Result};
use org_access::OrganizationsAccess;
use org_config::ServiceConfig;
use org_provider::aws::AwsSession;
use org_server::{McpServer, ServerInfo};
use org_tools::{ToolRegistry, register_all};
use tokio::io::BufReader;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::from_env().context("invalid configuration")?;
    org_telemetry::init(config.log_level()).context("failed to initialise logging")?;

    debug!(
        profile = config.aws_profile(),
        region = config.aws_region(),
        readonly_mode = config.readonly_mode(),
        master_account_only = config.master_account_only(),
        log_level = %config.log_level(),
        "loaded configuration"
    );

    let session = AwsSession::load(config.aws_profile(), config.aws_region()).await;
    let access = OrganizationsAccess::new(
        &config,
        Arc::new(session.organizations()),
        Arc::new(session.identity()),
    );

    let registry = ToolRegistry::new().with_read_only(config.readonly_mode());
    register_all(&registry, Arc::new(access)).context("failed to register tools")?;

    let server = McpServer::new(Arc::new(registry), ServerInfo::for_config(&config));
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = server.run(stdin, stdout) => result.context("server loop failed")?,
        _ = tokio::signal::ctrl_c() => info!("interrupted; shutting down"),
    }

    Ok(())
}
