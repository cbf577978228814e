//! Tool lookup table and dispatch for the REST shim.

use std::fmt;
use std::str::FromStr;

use leasing_core::control::{
    ControlError, LeasingControlPlane, LeasingEmailRequest, ProspectCriteria,
};
use leasing_mcp::tools::charts::IndividualChartParams;
use leasing_mcp::tools::query::QueryDatabaseParams;
use leasing_mcp::tools::reports::{LeasingEmailParams, QualifiedProspectsParams};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use surrealdb::Connection;

/// Operations callable through `POST /api/tools/call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    GetSchema,
    QueryDatabase,
    GuestCardSummary,
    QualifiedProspects,
    MarketRentAnalysis,
    GenerateLeasingEmail,
    CreateMarketReport,
    CreateIndividualChart,
}

/// Catalog entry describing one tool.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToolEntry {
    pub name: &'static str,
    #[serde(skip)]
    pub kind: ToolKind,
    pub description: &'static str,
    pub parameters: &'static [&'static str],
}

pub const TOOLS: &[ToolEntry] = &[
    ToolEntry {
        name: "get_schema",
        kind: ToolKind::GetSchema,
        description: "Describe both tables, their columns, key metrics and load status.",
        parameters: &[],
    },
    ToolEntry {
        name: "query_database",
        kind: ToolKind::QueryDatabase,
        description: "Run a read-only SurrealQL SELECT and return a markdown table.",
        parameters: &["query"],
    },
    ToolEntry {
        name: "guest_card_summary",
        kind: ToolKind::GuestCardSummary,
        description: "Totals, budget overview and breakdowns over all guest cards.",
        parameters: &[],
    },
    ToolEntry {
        name: "qualified_prospects",
        kind: ToolKind::QualifiedProspects,
        description: "Active prospects meeting income and credit minimums.",
        parameters: &["min_income", "min_credit"],
    },
    ToolEntry {
        name: "market_rent_analysis",
        kind: ToolKind::MarketRentAnalysis,
        description: "Rent statistics, distribution and positioning of nearby listings.",
        parameters: &[],
    },
    ToolEntry {
        name: "generate_leasing_email",
        kind: ToolKind::GenerateLeasingEmail,
        description: "Figures and writing instructions for a leasing update email.",
        parameters: &[
            "recipient_name",
            "sender_name",
            "current_rate",
            "previous_rate",
            "showings_confirmed",
            "showings_attended",
            "interested_parties",
            "pending_applications",
            "withdrawn_applications",
            "upcoming_showings",
        ],
    },
    ToolEntry {
        name: "create_market_report",
        kind: ToolKind::CreateMarketReport,
        description: "Six-panel PNG market report with key insights, embedded as base64.",
        parameters: &[],
    },
    ToolEntry {
        name: "create_individual_chart",
        kind: ToolKind::CreateIndividualChart,
        description: "One PNG chart selected by chart_type, embedded as base64.",
        parameters: &["chart_type"],
    },
];

impl ToolKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        TOOLS
            .iter()
            .find(|entry| entry.kind == self)
            .map_or("unknown", |entry| entry.name)
    }

    #[must_use]
    pub fn available() -> Vec<&'static str> {
        TOOLS.iter().map(|entry| entry.name).collect()
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTool(pub String);

impl fmt::Display for UnknownTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown tool: {}", self.0)
    }
}

impl std::error::Error for UnknownTool {}

impl FromStr for ToolKind {
    type Err = UnknownTool;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();
        TOOLS
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.kind)
            .ok_or_else(|| UnknownTool(name.to_string()))
    }
}

/// Arguments that do not fit the tool's parameters.
#[derive(Debug)]
pub struct ArgumentError {
    pub tool: ToolKind,
    pub source: serde_json::Error,
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid arguments for {}: {}", self.tool, self.source)
    }
}

impl std::error::Error for ArgumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

fn decode<T: DeserializeOwned>(tool: ToolKind, arguments: Value) -> Result<T, ArgumentError> {
    let arguments = match arguments {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|source| ArgumentError { tool, source })
}

/// Decodes `arguments` for `tool` and runs it against the control plane.
///
/// The outer error covers argument decoding; the inner result is the tool's
/// own outcome.
///
/// # Errors
/// Returns `ArgumentError` if `arguments` cannot be decoded for `tool`.
pub async fn dispatch<C: Connection>(
    control: &LeasingControlPlane<C>,
    tool: ToolKind,
    arguments: Value,
) -> Result<Result<String, ControlError>, ArgumentError> {
    let outcome = match tool {
        ToolKind::GetSchema => Ok(control.get_schema()),
        ToolKind::QueryDatabase => {
            let params: QueryDatabaseParams = decode(tool, arguments)?;
            control.query_database(&params.query).await
        }
        ToolKind::GuestCardSummary => control.guest_card_summary(),
        ToolKind::QualifiedProspects => {
            let params: QualifiedProspectsParams = decode(tool, arguments)?;
            control.qualified_prospects(&ProspectCriteria::from(params))
        }
        ToolKind::MarketRentAnalysis => control.market_rent_analysis(),
        ToolKind::GenerateLeasingEmail => {
            let params: LeasingEmailParams = decode(tool, arguments)?;
            control.generate_leasing_email(&LeasingEmailRequest::from(params))
        }
        ToolKind::CreateMarketReport => control.create_market_report().await,
        ToolKind::CreateIndividualChart => {
            let params: IndividualChartParams = decode(tool, arguments)?;
            control.create_individual_chart(&params.chart_type).await
        }
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_one_entry() {
        for entry in TOOLS {
            assert_eq!(entry.name.parse::<ToolKind>(), Ok(entry.kind));
            assert_eq!(entry.kind.name(), entry.name);
        }
        assert_eq!(ToolKind::available().len(), 8);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            "drop_tables".parse::<ToolKind>(),
            Err(UnknownTool("drop_tables".to_string()))
        );
    }

    #[test]
    fn null_arguments_decode_as_empty_object() {
        let params: QualifiedProspectsParams =
            decode(ToolKind::QualifiedProspects, Value::Null).unwrap();
        assert!(params.min_income.is_none());

        let err = decode::<QueryDatabaseParams>(ToolKind::QueryDatabase, Value::Null).unwrap_err();
        assert!(err.to_string().starts_with("invalid arguments for query_database"));
    }
}
