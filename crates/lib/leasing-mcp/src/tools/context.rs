use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;

use crate::LeasingMcp;

/// Payload listing the MCP commands.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HelpCommands {
    pub commands: Vec<String>,
}

impl Default for HelpCommands {
    fn default() -> Self {
        Self {
            commands: vec![
                "help - List the MCP commands this server provides.".to_string(),
                "health - Liveness check, returns ok.".to_string(),
                "get_schema - Describe both tables, their columns and load status.".to_string(),
                "query_database - Run a read-only SurrealQL SELECT and get a markdown table."
                    .to_string(),
                "guest_card_summary - Totals, budgets and breakdowns over all guest cards."
                    .to_string(),
                "qualified_prospects - Active prospects meeting income and credit minimums."
                    .to_string(),
                "market_rent_analysis - Rent statistics and positioning of nearby listings."
                    .to_string(),
                "generate_leasing_email - Figures and instructions for a leasing update email."
                    .to_string(),
                "create_market_report - Six-panel PNG market report with key insights."
                    .to_string(),
                "create_individual_chart - One PNG chart selected by chart_type.".to_string(),
            ],
        }
    }
}

#[tool_router(router = tool_router_context, vis = "pub")]
impl<C: Connection> LeasingMcp<C> {
    #[tool(description = "List the MCP commands this server provides.")]
    async fn help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::json(HelpCommands::default())?]))
    }
}
