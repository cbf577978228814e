use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;

use crate::{LeasingMcp, helpers};

/// Parameters for running a read-only query.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueryDatabaseParams {
    /// A single `SurrealQL` `SELECT` statement.
    pub query: String,
}

#[tool_router(router = tool_router_query, vis = "pub")]
impl<C: Connection> LeasingMcp<C> {
    #[tool(
        description = "Get the schema of both tables with raw and derived columns, key metrics and load status. Use this first to understand the data model before writing queries."
    )]
    async fn get_schema(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text(
            self.control().get_schema(),
        )]))
    }

    #[tool(
        description = "Run a read-only SurrealQL SELECT against guest_cards or nearby_units and return the rows as a markdown table. Wrap column names with spaces in backticks, e.g. SELECT Name, `Credit Score` FROM guest_cards WHERE Max_Rent_Amount >= 2500."
    )]
    async fn query_database(
        &self,
        Parameters(params): Parameters<QueryDatabaseParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(helpers::control_result(
            self.control().query_database(&params.query).await,
        ))
    }
}
