//! MCP tool modules.
//!
//! Tools are grouped by purpose: schema and ad-hoc queries, prebuilt
//! reports, rendered charts and contextual help.

pub mod charts;
pub mod query;
pub mod reports;
mod context;
