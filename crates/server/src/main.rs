//! dxquiz worker host entry point.
//!
//! Boots the offline cache registration from configuration and serves MCP on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use anyhow::Result;
use dxquiz_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod context;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        cache_version = %config.cache_version,
        scope = %config.scope,
        db_path = %config.db_path.display(),
        "Starting dxquiz worker on stdio transport"
    );

    let context = context::WorkerContext::boot(config).await?;
    let handler = handler::DxWorkerServer::new(context);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
