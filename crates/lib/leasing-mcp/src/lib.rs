//! MCP server implementation for leasing-mcp.
//!
//! This crate wires the leasing control plane into rmcp tool handlers and
//! provides the stdio and streamable HTTP runners.

mod helpers;
pub mod server;
pub mod tools;

use std::sync::Arc;

use leasing_core::control::LeasingControlPlane;
use leasing_core::services::SchemaRegistry;
use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use surrealdb::Connection;

pub use helpers::control_result;

const SERVER_INSTRUCTIONS: &str = r"leasing-mcp answers questions about a rental property's prospects and its local rental market.

Data:
- `guest_cards`: prospective tenant inquiries (budget, income, credit, pets, activity).
- `nearby_units`: comparable advertised listings (rent, size, similarity, price comparison).
- The subject property rents for $2,400 at roughly 915 sqft.

Workflow:
1. Call `get_schema` to see columns, derived numeric columns and which tables are loaded.
2. Use the report tools for common questions:
   - `guest_card_summary` for inquiry totals, budgets and breakdowns.
   - `qualified_prospects` for active prospects meeting income and credit thresholds.
   - `market_rent_analysis` for market rent statistics and positioning.
   - `generate_leasing_email` for the figures behind a leasing update email.
   - `create_market_report` for a six-panel PNG report with key insights.
   - `create_individual_chart` for one PNG chart by `chart_type`.
3. Use `query_database` for anything else. Queries are read-only SurrealQL SELECT statements;
   wrap column names containing spaces or slashes in backticks.

Notes:
- Every tool returns markdown text. Chart tools save the PNG to the charts directory and embed
  it as a base64 data URI.
- Use `help` for the command list.
- `health` returns `ok`.";

/// MCP server wrapper around the leasing control plane and tool routers.
#[derive(Clone)]
pub struct LeasingMcp<C: Connection> {
    tool_router: ToolRouter<Self>,
    control: LeasingControlPlane<C>,
}

impl<C: Connection> LeasingMcp<C> {
    /// Creates a new server using a registry by value.
    #[must_use]
    pub fn new(registry: SchemaRegistry<C>) -> Self {
        Self::with_registry(Arc::new(registry))
    }

    /// Creates a new server using a shared registry handle.
    #[must_use]
    pub fn with_registry(registry: Arc<SchemaRegistry<C>>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_query()
            + Self::tool_router_reports()
            + Self::tool_router_charts()
            + Self::tool_router_context();
        Self {
            tool_router,
            control: LeasingControlPlane::from_arc(registry),
        }
    }

    pub(crate) const fn control(&self) -> &LeasingControlPlane<C> {
        &self.control
    }

    /// Names of every tool this server exposes.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl<C: Connection> LeasingMcp<C> {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

#[tool_handler]
impl<C: Connection> ServerHandler for LeasingMcp<C> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
