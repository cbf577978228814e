//! Daemon entry point for the leasing analytics MCP server.
//!
//! Loads configuration from the command line and environment, builds the
//! schema registry from the data directory, and serves MCP over stdio or
//! HTTP.

mod config;
mod registry;

use std::sync::Arc;

use leasing_api::HttpServer;
use leasing_mcp::server::serve_stdio;
use tracing_subscriber::EnvFilter;

use crate::config::{LeasingConfig, Transport};
use crate::registry::build_registry;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Logs go to stderr so stdout stays reserved for the stdio transport.
fn init_logging(filter: &str) -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter)?)
        .with_writer(std::io::stderr)
        .try_init()
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = LeasingConfig::from_args()?;
    init_logging(&config.log_filter)?;

    let registry = Arc::new(build_registry(&config).await?);
    match config.transport {
        Transport::Stdio => serve_stdio(registry).await,
        Transport::Http => HttpServer::new(registry, config.api_config()).serve().await,
    }
}
