//! MCP server runners for leasing-mcp.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use leasing_core::services::SchemaRegistry;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use surrealdb::Connection;
use tracing::info;

use crate::LeasingMcp;

/// Path the streamable HTTP endpoint is mounted under.
pub const MCP_PATH: &str = "/mcp";

/// Configuration for the MCP streamable HTTP endpoint.
#[derive(Debug, Clone)]
pub struct McpHttpConfig {
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
}

impl McpHttpConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stateful_mode: true,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
        }
    }

    #[must_use]
    pub const fn with_stateful_mode(mut self, stateful_mode: bool) -> Self {
        self.stateful_mode = stateful_mode;
        self
    }

    #[must_use]
    pub const fn with_sse_keep_alive(mut self, sse_keep_alive: Option<Duration>) -> Self {
        self.sse_keep_alive = sse_keep_alive;
        self
    }

    #[must_use]
    pub const fn with_sse_retry(mut self, sse_retry: Option<Duration>) -> Self {
        self.sse_retry = sse_retry;
        self
    }
}

impl Default for McpHttpConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Serves the MCP server over stdio until the client disconnects.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio<C: Connection>(
    registry: Arc<SchemaRegistry<C>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service = LeasingMcp::with_registry(registry);
    let (stdin, stdout) = stdio();
    info!("serving MCP over stdio");
    let running = serve_server(service, (stdin, stdout)).await?;
    let _ = running.waiting().await?;
    Ok(())
}

/// Builds the streamable HTTP service; each session gets its own server
/// sharing `registry`.
#[must_use]
pub fn streamable_http_service<C>(
    registry: Arc<SchemaRegistry<C>>,
    config: &McpHttpConfig,
) -> StreamableHttpService<LeasingMcp<C>, LocalSessionManager>
where
    C: Connection + Send + Sync + 'static,
{
    StreamableHttpService::new(
        move || Ok(LeasingMcp::with_registry(registry.clone())),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            sse_keep_alive: config.sse_keep_alive,
            sse_retry: config.sse_retry,
            stateful_mode: config.stateful_mode,
            ..Default::default()
        },
    )
}

/// Router with the streamable HTTP service nested at [`MCP_PATH`].
#[must_use]
pub fn streamable_http_router<C>(
    registry: Arc<SchemaRegistry<C>>,
    config: &McpHttpConfig,
) -> Router
where
    C: Connection + Send + Sync + 'static,
{
    Router::new().nest_service(MCP_PATH, streamable_http_service(registry, config))
}
