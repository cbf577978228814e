use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use leasing_store::models::Table;
use surrealdb::engine::local::{Db, Mem};
use surrealdb::{Connection, Surreal};
use tracing::{error, info, warn};

use crate::loader::{DEFAULT_SPECS, LoadOutcome, LoadReport, TableLoader, TableSpec};
use crate::store::{QueryRows, StoreResult, SurrealTableStore};

const DEFAULT_NAMESPACE: &str = "leasing";
const DEFAULT_DATABASE: &str = "analytics";
const DEFAULT_CHARTS_DIR: &str = "charts";

/// Configuration for building the schema registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub data_dir: PathBuf,
    /// Where rendered chart images are written.
    pub charts_dir: PathBuf,
    pub namespace: String,
    pub database: String,
    pub specs: Vec<TableSpec>,
}

impl RegistryConfig {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            charts_dir: PathBuf::from(DEFAULT_CHARTS_DIR),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            specs: DEFAULT_SPECS.to_vec(),
        }
    }

    #[must_use]
    pub fn with_charts_dir(mut self, charts_dir: impl Into<PathBuf>) -> Self {
        self.charts_dir = charts_dir.into();
        self
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    #[must_use]
    pub fn with_specs(mut self, specs: Vec<TableSpec>) -> Self {
        self.specs = specs;
        self
    }
}

#[derive(Debug)]
pub enum RegistryError {
    Database(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(message) => write!(f, "failed to open table store: {message}"),
        }
    }
}

impl Error for RegistryError {}

/// Why a configured table is missing from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsentReason {
    SourceMissing { path: PathBuf },
    LoadFailed(String),
    StoreFailed(String),
}

impl fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceMissing { path } => write!(f, "source not found: {}", path.display()),
            Self::LoadFailed(message) => write!(f, "load failed: {message}"),
            Self::StoreFailed(message) => write!(f, "store insert failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsentTable {
    pub name: String,
    pub reason: AbsentReason,
}

/// Immutable collection of the named, queryable tables.
///
/// Built once with [`SchemaRegistry::build`]; afterwards it only serves
/// lookups and read queries, so it can be shared across any number of readers
/// without locking.
pub struct SchemaRegistry<C: Connection> {
    tables: Vec<Table>,
    reports: Vec<LoadReport>,
    absent: Vec<AbsentTable>,
    charts_dir: PathBuf,
    store: SurrealTableStore<C>,
}

impl SchemaRegistry<Db> {
    /// Builds a registry backed by an embedded in-memory database.
    ///
    /// # Errors
    /// Returns `RegistryError` if the embedded database cannot be opened.
    pub async fn in_memory(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|err| RegistryError::Database(err.to_string()))?;
        Self::build(db, config).await
    }
}

impl<C: Connection> SchemaRegistry<C> {
    /// Loads every configured source and registers the tables that loaded.
    ///
    /// Each source is isolated: a missing file, a decoding failure, or a store
    /// failure omits that table and leaves the others untouched.
    ///
    /// # Errors
    /// Returns `RegistryError` only if the namespace or database cannot be selected.
    pub async fn build(db: Surreal<C>, config: &RegistryConfig) -> Result<Self, RegistryError> {
        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .map_err(|err| RegistryError::Database(err.to_string()))?;

        let store = SurrealTableStore::new(db);
        let mut tables = Vec::with_capacity(config.specs.len());
        let mut reports = Vec::with_capacity(config.specs.len());
        let mut absent = Vec::new();

        for spec in &config.specs {
            match register_source(&store, &config.data_dir, spec).await {
                Ok((table, report)) => {
                    tables.push(table);
                    reports.push(report);
                }
                Err(reason) => absent.push(AbsentTable {
                    name: spec.name.to_string(),
                    reason,
                }),
            }
        }

        Ok(Self {
            tables,
            reports,
            absent,
            charts_dir: config.charts_dir.clone(),
            store,
        })
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name() == name)
    }

    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(Table::name).collect()
    }

    #[must_use]
    pub fn absent(&self) -> &[AbsentTable] {
        &self.absent
    }

    #[must_use]
    pub fn load_reports(&self) -> &[LoadReport] {
        &self.reports
    }

    #[must_use]
    pub fn charts_dir(&self) -> &Path {
        &self.charts_dir
    }

    #[must_use]
    pub fn row_count(&self, name: &str) -> Option<usize> {
        self.table(name).map(Table::len)
    }

    /// Runs a read statement against the registered tables.
    ///
    /// # Errors
    /// Returns `StoreError` if the statement fails to parse or execute.
    pub async fn query(&self, statement: &str) -> StoreResult<QueryRows> {
        self.store.select_rows(statement).await
    }
}

async fn register_source<C: Connection>(
    store: &SurrealTableStore<C>,
    data_dir: &Path,
    spec: &TableSpec,
) -> Result<(Table, LoadReport), AbsentReason> {
    let (table, report) = match TableLoader::load_from_dir(data_dir, spec) {
        Ok(LoadOutcome::Loaded { table, report }) => (table, report),
        Ok(LoadOutcome::Absent { path }) => {
            warn!(
                table = spec.name,
                path = %path.display(),
                "source file not found; table omitted"
            );
            return Err(AbsentReason::SourceMissing { path });
        }
        Err(err) => {
            error!(table = spec.name, error = %err, "failed to load source; table omitted");
            return Err(AbsentReason::LoadFailed(err.to_string()));
        }
    };

    for entry in &report.malformed {
        warn!(
            table = spec.name,
            column = %entry.column,
            parser = entry.parser.name(),
            count = entry.count,
            "fields could not be parsed and were stored as null"
        );
    }
    if report.ragged_rows > 0 {
        warn!(table = spec.name, rows = report.ragged_rows, "records with unexpected field counts");
    }
    for column in &report.missing_sources {
        warn!(table = spec.name, column = %column, "configured source column missing");
    }

    if let Err(err) = store.insert_table(&table).await {
        error!(table = spec.name, error = %err, "failed to register table; table omitted");
        return Err(AbsentReason::StoreFailed(err.to_string()));
    }

    info!(table = spec.name, rows = table.len(), "loaded table");
    Ok((table, report))
}
