//! HTTP server for leasing-mcp.
//!
//! Serves the MCP streamable HTTP endpoint next to a small REST shim for
//! clients that do not speak MCP, behind host and origin allow-listing.

pub mod allowlist;
pub mod tools;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Json, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use leasing_core::control::LeasingControlPlane;
use leasing_core::services::SchemaRegistry;
use leasing_mcp::server::{MCP_PATH, McpHttpConfig, streamable_http_router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use surrealdb::Connection;
use tracing::{info, warn};

use crate::allowlist::{
    AllowList, DEFAULT_ALLOWED_HOSTS, DEFAULT_ALLOWED_ORIGINS, cors_layer, enforce,
};
use crate::tools::{TOOLS, ToolEntry, ToolKind, dispatch};

const SERVICE_NAME: &str = "leasing-mcp";

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub addr: SocketAddr,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub allowed_hosts: Vec<String>,
    pub allowed_origins: Vec<String>,
    pub mcp: McpHttpConfig,
}

impl ApiServerConfig {
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            max_body_bytes: 1024 * 1024,
            request_timeout: Duration::from_secs(30),
            allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(ToString::to_string).collect(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(ToString::to_string)
                .collect(),
            mcp: McpHttpConfig::default(),
        }
    }

    #[must_use]
    pub const fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub fn with_allowed_hosts(mut self, allowed_hosts: Vec<String>) -> Self {
        self.allowed_hosts = allowed_hosts;
        self
    }

    #[must_use]
    pub fn with_allowed_origins(mut self, allowed_origins: Vec<String>) -> Self {
        self.allowed_origins = allowed_origins;
        self
    }

    #[must_use]
    pub const fn with_mcp(mut self, mcp: McpHttpConfig) -> Self {
        self.mcp = mcp;
        self
    }
}

/// HTTP server wrapper.
pub struct HttpServer<C: Connection> {
    config: ApiServerConfig,
    registry: Arc<SchemaRegistry<C>>,
}

impl<C> HttpServer<C>
where
    C: Connection + Send + Sync + 'static,
{
    #[must_use]
    pub const fn new(registry: Arc<SchemaRegistry<C>>, config: ApiServerConfig) -> Self {
        Self { config, registry }
    }

    /// Runs the HTTP server until shutdown.
    ///
    /// # Errors
    /// Returns any allow-list, listener or server error.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.addr;
        let app = build_router(self.registry, &self.config)?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(%addr, mcp = MCP_PATH, "{SERVICE_NAME} listening");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

struct AppState<C: Connection> {
    control: LeasingControlPlane<C>,
    request_timeout: Duration,
}

impl<C: Connection> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            control: self.control.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

/// Builds the complete application: REST routes, the MCP endpoint, the
/// allow-list middleware and CORS.
///
/// # Errors
/// Returns `regex::Error` if an allow-list pattern cannot be compiled.
pub fn build_router<C>(
    registry: Arc<SchemaRegistry<C>>,
    config: &ApiServerConfig,
) -> Result<Router, regex::Error>
where
    C: Connection + Send + Sync + 'static,
{
    let allow = Arc::new(AllowList::new(
        &config.allowed_hosts,
        &config.allowed_origins,
    )?);
    let state = AppState {
        control: LeasingControlPlane::from_arc(registry.clone()),
        request_timeout: config.request_timeout,
    };

    let api = Router::new()
        .route("/", get(index))
        .route("/health", get(health::<C>))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/call", post(call_tool::<C>))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(state);

    Ok(api
        .merge(streamable_http_router(registry, &config.mcp))
        .layer(middleware::from_fn_with_state(allow.clone(), enforce))
        .layer(cors_layer(&allow)))
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<Vec<&'static str>>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
    available: Option<Vec<&'static str>>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            available: None,
        }
    }

    fn unknown_tool(message: impl Into<String>) -> Self {
        Self {
            available: Some(ToolKind::available()),
            ..Self::bad_request(message)
        }
    }

    fn timeout(tool: ToolKind) -> Self {
        Self {
            status: StatusCode::REQUEST_TIMEOUT,
            message: format!("{tool} timed out"),
            available: None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            error: self.message,
            available: self.available,
        });
        (self.status, payload).into_response()
    }
}

/// Body of `POST /api/tools/call`.
#[derive(Debug, Deserialize)]
struct CallRequest {
    #[serde(alias = "tool")]
    name: Option<String>,
    #[serde(default, alias = "args", alias = "input")]
    arguments: Value,
}

async fn index() -> Json<Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "mcp": MCP_PATH,
            "health": "/health",
            "tools": "/api/tools",
            "call": "/api/tools/call",
        },
    }))
}

async fn health<C>(State(state): State<AppState<C>>) -> Json<Value>
where
    C: Connection + Send + Sync + 'static,
{
    let registry = state.control.registry();
    let tables: serde_json::Map<String, Value> = registry
        .tables()
        .iter()
        .map(|table| (table.name().to_string(), Value::from(table.len())))
        .collect();
    let absent: Vec<Value> = registry
        .absent()
        .iter()
        .map(|absent| json!({ "name": absent.name, "reason": absent.reason.to_string() }))
        .collect();
    Json(json!({ "status": "ok", "tables": tables, "absent": absent }))
}

async fn list_tools() -> Json<Value> {
    let tools: &[ToolEntry] = TOOLS;
    Json(json!({ "tools": tools }))
}

async fn call_tool<C>(
    State(state): State<AppState<C>>,
    payload: Result<Json<CallRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
    C: Connection + Send + Sync + 'static,
{
    let Json(request) = payload?;
    let name = request
        .name
        .ok_or_else(|| ApiError::unknown_tool("missing tool name"))?;
    let tool: ToolKind = name
        .parse()
        .map_err(|err: tools::UnknownTool| ApiError::unknown_tool(err.to_string()))?;

    let outcome = tokio::time::timeout(
        state.request_timeout,
        dispatch(&state.control, tool, request.arguments),
    )
    .await
    .map_err(|_| ApiError::timeout(tool))?
    .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let (text, is_error) = match outcome {
        Ok(text) => (text, false),
        Err(err) => {
            warn!(%tool, error = %err, "tool call failed");
            (err.to_string(), true)
        }
    };
    Ok(Json(json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })))
}
