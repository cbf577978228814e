use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;

use crate::{LeasingMcp, helpers};

/// Parameters for rendering a single chart.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct IndividualChartParams {
    /// One of `rent_histogram`, `credit_pie`, `pet_bar`, `budget_histogram`,
    /// `price_comparison`, `activity_pie`, `income_vs_rent`, `similarity_rent`.
    pub chart_type: String,
}

#[tool_router(router = tool_router_charts, vis = "pub")]
impl<C: Connection> LeasingMcp<C> {
    #[tool(
        description = "Render a six-panel PNG market report (rent distribution, credit scores, pet preferences, budgets, price comparison, activity types) into the charts directory and return key insights with the image embedded as base64."
    )]
    async fn create_market_report(&self) -> Result<CallToolResult, ErrorData> {
        Ok(helpers::control_result(
            self.control().create_market_report().await,
        ))
    }

    #[tool(
        description = "Render one PNG chart into the charts directory and return its path with the image embedded as base64. chart_type: rent_histogram, credit_pie, pet_bar, budget_histogram, price_comparison, activity_pie, income_vs_rent or similarity_rent."
    )]
    async fn create_individual_chart(
        &self,
        Parameters(params): Parameters<IndividualChartParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(helpers::control_result(
            self.control()
                .create_individual_chart(&params.chart_type)
                .await,
        ))
    }
}
