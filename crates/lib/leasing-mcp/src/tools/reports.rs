use leasing_core::control::{LeasingEmailRequest, ProspectCriteria};
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

/// Parameters for finding qualified prospects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QualifiedProspectsParams {
    /// Minimum monthly income (default 7200, three times the $2,400 rent).
    pub min_income: Option<f64>,
    /// Minimum credit score (default "660").
    pub min_credit: Option<String>,
}

impl From<QualifiedProspectsParams> for ProspectCriteria {
    fn from(params: QualifiedProspectsParams) -> Self {
        let defaults = Self::default();
        Self {
            min_income: params.min_income.unwrap_or(defaults.min_income),
            min_credit: params.min_credit.unwrap_or(defaults.min_credit),
        }
    }
}

/// Parameters for the leasing update email context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LeasingEmailParams {
    /// Name of the email recipient (default "Chi").
    pub recipient_name: Option<String>,
    /// Name of the sender (default "Shanna").
    pub sender_name: Option<String>,
    /// Current advertised rent (default 2400).
    pub current_rate: Option<f64>,
    /// Rent before the latest adjustment (default 2500).
    pub previous_rate: Option<f64>,
    /// Confirmed showings (default 4).
    pub showings_confirmed: Option<u32>,
    /// Showings that were attended (default 3).
    pub showings_attended: Option<u32>,
    /// Parties that seemed interested (default 2).
    pub interested_parties: Option<u32>,
    /// Pending applications (default 0).
    pub pending_applications: Option<u32>,
    /// Withdrawn applications (default 2).
    pub withdrawn_applications: Option<u32>,
    /// Scheduled upcoming showings (default 2).
    pub upcoming_showings: Option<u32>,
}

impl From<LeasingEmailParams> for LeasingEmailRequest {
    fn from(params: LeasingEmailParams) -> Self {
        let defaults = Self::default();
        Self {
            recipient_name: params.recipient_name.unwrap_or(defaults.recipient_name),
            sender_name: params.sender_name.unwrap_or(defaults.sender_name),
            current_rate: params.current_rate.unwrap_or(defaults.current_rate),
            previous_rate: params.previous_rate.unwrap_or(defaults.previous_rate),
            showings_confirmed: params
                .showings_confirmed
                .unwrap_or(defaults.showings_confirmed),
            showings_attended: params
                .showings_attended
                .unwrap_or(defaults.showings_attended),
            interested_parties: params
                .interested_parties
                .unwrap_or(defaults.interested_parties),
            pending_applications: params
                .pending_applications
                .unwrap_or(defaults.pending_applications),
            withdrawn_applications: params
                .withdrawn_applications
                .unwrap_or(defaults.withdrawn_applications),
            upcoming_showings: params
                .upcoming_showings
                .unwrap_or(defaults.upcoming_showings),
        }
    }
}

#[tool_router(router = tool_router_reports, vis = "pub")]
impl<C: Connection> LeasingMcp<C> {
    #[tool(
        description = "Summarize all guest cards: total inquiries, budget overview, activity breakdown, pet preferences and credit score distribution."
    )]
    async fn guest_card_summary(&self) -> Result<CallToolResult, ErrorData> {
        Ok(helpers::control_result(self.control().guest_card_summary()))
    }

    #[tool(
        description = "List active prospects whose monthly income and credit score meet the given minimums, highest income first."
    )]
    async fn qualified_prospects(
        &self,
        Parameters(params): Parameters<QualifiedProspectsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let criteria = ProspectCriteria::from(params);
        Ok(helpers::control_result(
            self.control().qualified_prospects(&criteria),
        ))
    }

    #[tool(
        description = "Analyze comparable nearby listings: rent statistics, rent distribution, price comparison against the subject property and market position."
    )]
    async fn market_rent_analysis(&self) -> Result<CallToolResult, ErrorData> {
        Ok(helpers::control_result(self.control().market_rent_analysis()))
    }

    #[tool(
        description = "Gather the figures for a leasing update email (pricing, guest card stats, prospect quality, showings, applications) with instructions for writing it."
    )]
    async fn generate_leasing_email(
        &self,
        Parameters(params): Parameters<LeasingEmailParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = LeasingEmailRequest::from(params);
        Ok(helpers::control_result(
            self.control().generate_leasing_email(&request),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_email_fields_take_defaults() {
        let params: LeasingEmailParams =
            serde_json::from_value(serde_json::json!({ "current_rate": 2350.0 })).unwrap();
        let request = LeasingEmailRequest::from(params);
        assert!((request.current_rate - 2350.0).abs() < f64::EPSILON);
        assert_eq!(request.recipient_name, "Chi");
        assert_eq!(request.withdrawn_applications, 2);
    }

    #[test]
    fn omitted_prospect_fields_take_defaults() {
        let criteria = ProspectCriteria::from(QualifiedProspectsParams {
            min_income: None,
            min_credit: Some("700".to_string()),
        });
        assert!((criteria.min_income - 7200.0).abs() < f64::EPSILON);
        assert_eq!(criteria.min_credit, "700");
    }
}
