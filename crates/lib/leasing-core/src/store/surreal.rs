use std::{error::Error, fmt, sync::Arc};

use leasing_store::models::Table;
use serde_json::{Map, Value};
use surrealdb::{Connection, Surreal};

#[derive(Debug)]
pub enum StoreError {
    Surreal(Box<surrealdb::Error>),
    InvalidInput(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surreal(err) => write!(f, "SurrealDB error: {err}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
        }
    }
}

impl Error for StoreError {}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        Self::Surreal(Box::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Rows returned by a read query, one JSON object per row.
pub type QueryRows = Vec<Map<String, Value>>;

/// Table store over a `SurrealDB` connection.
///
/// Writes are crate-private: tables are inserted once while the schema
/// registry is built and only read afterwards.
pub struct SurrealTableStore<C: Connection> {
    db: Arc<Surreal<C>>,
}

impl<C: Connection> Clone for SurrealTableStore<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealTableStore<C> {
    #[must_use]
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db: Arc::new(db),
        }
    }

    #[must_use]
    pub const fn from_arc(db: Arc<Surreal<C>>) -> Self {
        Self { db }
    }

    /// Inserts every record of `table`, keyed by row index so natural order
    /// is preserved on reads.
    ///
    /// # Errors
    /// Returns `StoreError` if the table name is not a plain identifier or the
    /// database write fails.
    pub(crate) async fn insert_table(&self, table: &Table) -> StoreResult<usize> {
        ensure_identifier(table.name())?;
        if table.is_empty() {
            return Ok(0);
        }
        let rows: Vec<Value> = table
            .to_json_rows()
            .into_iter()
            .enumerate()
            .map(|(index, mut row)| {
                row.insert("id".to_string(), Value::from(index));
                Value::Object(row)
            })
            .collect();
        let count = rows.len();
        let query = format!("INSERT INTO {} $rows;", table.name());
        let mut response = self.db.query(query).bind(("rows", rows)).await?;
        let _: surrealdb::Value = response.take(0)?;
        Ok(count)
    }

    /// Runs a single read statement and returns its rows.
    ///
    /// Callers are responsible for only passing read statements.
    ///
    /// # Errors
    /// Returns `StoreError` if the statement fails to parse or execute.
    pub async fn select_rows(&self, statement: &str) -> StoreResult<QueryRows> {
        let mut response = self.db.query(statement.to_string()).await?;
        let value: surrealdb::Value = response.take(0)?;
        Ok(into_rows(value.into_inner().into_json()))
    }
}

fn into_rows(value: Value) -> QueryRows {
    match value {
        Value::Array(items) => items.into_iter().map(into_row).collect(),
        Value::Null => Vec::new(),
        other => vec![into_row(other)],
    }
}

fn into_row(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

fn ensure_identifier(name: &str) -> StoreResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        && !name.starts_with(|ch: char| ch.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidInput(format!(
            "table name must be a plain identifier: {name}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_results_become_single_value_rows() {
        let rows = into_rows(Value::from(3));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("value"), Some(&Value::from(3)));
    }

    #[test]
    fn array_results_map_to_rows() {
        let rows = into_rows(serde_json::json!([{ "a": 1 }, { "a": 2 }]));
        assert_eq!(rows.len(), 2);
        assert!(into_rows(Value::Null).is_empty());
    }

    #[test]
    fn identifiers_are_validated() {
        assert!(ensure_identifier("nearby_units").is_ok());
        assert!(ensure_identifier("units; DELETE x").is_err());
        assert!(ensure_identifier("1units").is_err());
        assert!(ensure_identifier("").is_err());
    }
}
