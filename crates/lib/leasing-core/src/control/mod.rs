use std::{error::Error, fmt, sync::Arc};

use leasing_store::models::Table;
use surrealdb::Connection;

use crate::services::SchemaRegistry;
use crate::store::StoreError;

pub mod charts;
pub mod email;
pub mod guests;
pub mod markdown;
pub mod market;
pub mod query;
mod stats;

pub use charts::ChartKind;
pub use email::LeasingEmailRequest;
pub use guests::ProspectCriteria;
pub use query::ReadOnlyQuery;

#[derive(Debug)]
pub enum ControlError {
    /// A report needs a table that was not loaded at startup.
    TableAbsent(String),
    /// A caller-supplied query is not a single read statement.
    QueryRejected(String),
    /// A read query failed to parse or execute.
    QueryFailed(StoreError),
    InvalidArgument(String),
    /// No chart goes by this name.
    UnknownChart(String),
    /// A chart could not be drawn or written to disk.
    ChartFailed(String),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableAbsent(name) => write!(f, "Table `{name}` is not loaded."),
            Self::QueryRejected(reason) => write!(f, "Error: {reason}"),
            Self::QueryFailed(err) => write!(f, "Error executing query: {err}"),
            Self::InvalidArgument(message) => write!(f, "Invalid argument: {message}"),
            Self::UnknownChart(name) => write!(
                f,
                "Unknown chart type: {name}\n\nAvailable chart types:\n{}",
                charts::chart_catalog()
            ),
            Self::ChartFailed(message) => write!(f, "Error rendering chart: {message}"),
        }
    }
}

impl Error for ControlError {}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        Self::QueryFailed(err)
    }
}

/// Reporting and query operations over a shared schema registry.
pub struct LeasingControlPlane<C: Connection> {
    registry: Arc<SchemaRegistry<C>>,
}

impl<C: Connection> Clone for LeasingControlPlane<C> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<C: Connection> LeasingControlPlane<C> {
    #[must_use]
    pub fn new(registry: SchemaRegistry<C>) -> Self {
        Self::from_arc(Arc::new(registry))
    }

    #[must_use]
    pub const fn from_arc(registry: Arc<SchemaRegistry<C>>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry<C> {
        &self.registry
    }

    pub(crate) fn require_table(&self, name: &str) -> Result<&Table, ControlError> {
        self.registry
            .table(name)
            .ok_or_else(|| ControlError::TableAbsent(name.to_string()))
    }
}
