use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static NULL_FIELD: FieldValue = FieldValue::Null;

/// A single cell of a loaded table.
///
/// Raw columns keep their source text (or the integer/float kind inferred for
/// the whole column); derived columns are always `Number` or `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Number(f64),
    Text(String),
}

impl FieldValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the numeric value for integer and float cells.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Number(value) => Some(*value),
            Self::Null | Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_option(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Number)
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Integer(value) => Value::from(*value),
            Self::Number(value) => serde_json::Number::from_f64(*value)
                .map_or(Value::Null, Value::Number),
            Self::Text(value) => Value::String(value.clone()),
        }
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        Self::from_option(value)
    }
}

/// One row of a table, positionally aligned with the table's columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    values: Vec<FieldValue>,
}

impl Record {
    #[must_use]
    pub const fn new(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An immutable, named, ordered table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    /// Builds a table, padding short records with nulls and truncating long ones
    /// so every record matches the column count.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<String>, records: Vec<Record>) -> Self {
        let width = columns.len();
        let records = records
            .into_iter()
            .map(|record| {
                let mut values = record.values;
                values.resize(width, FieldValue::Null);
                Record { values }
            })
            .collect();
        Self {
            name: name.into(),
            columns,
            records,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Returns the record at `index` as a column-addressable row.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.records.get(index).map(|record| Row {
            columns: &self.columns,
            record,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().map(|record| Row {
            columns: &self.columns,
            record,
        })
    }

    /// Renders every record as a JSON object keyed by column name.
    #[must_use]
    pub fn to_json_rows(&self) -> Vec<Map<String, Value>> {
        self.rows().map(|row| row.to_json()).collect()
    }
}

/// Borrowed view of a record that resolves values by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    record: &'a Record,
}

impl<'a> Row<'a> {
    /// Value for `column`; unknown columns read as null.
    #[must_use]
    pub fn get(&self, column: &str) -> &'a FieldValue {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|index| self.record.values.get(index))
            .unwrap_or(&NULL_FIELD)
    }

    #[must_use]
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).as_f64()
    }

    /// Text for `column`, rendering numeric cells as they would print.
    #[must_use]
    pub fn text(&self, column: &str) -> Option<String> {
        match self.get(column) {
            FieldValue::Null => None,
            FieldValue::Integer(value) => Some(value.to_string()),
            FieldValue::Number(value) => Some(value.to_string()),
            FieldValue::Text(value) => Some(value.clone()),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        self.columns
            .iter()
            .zip(self.record.values.iter())
            .map(|(column, value)| (column.clone(), value.to_json()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            "units",
            vec!["Beds".to_string(), "Location".to_string()],
            vec![
                Record::new(vec![
                    FieldValue::Integer(2),
                    FieldValue::Text("about 1 mile away".to_string()),
                ]),
                Record::new(vec![FieldValue::Integer(1)]),
            ],
        )
    }

    #[test]
    fn short_records_are_padded_with_nulls() {
        let table = sample();
        let row = table.row(1).expect("second row");
        assert_eq!(row.get("Location"), &FieldValue::Null);
        assert_eq!(table.records()[1].len(), 2);
    }

    #[test]
    fn unknown_columns_read_as_null() {
        let table = sample();
        let row = table.row(0).expect("first row");
        assert!(row.get("Missing").is_null());
        assert_eq!(row.number("Beds"), Some(2.0));
        assert_eq!(row.text("Location").as_deref(), Some("about 1 mile away"));
    }

    #[test]
    fn json_rows_keep_nulls_explicit() {
        let rows = sample().to_json_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("Location"), Some(&Value::Null));
        assert_eq!(rows[0].get("Beds"), Some(&Value::from(2)));
    }

    #[test]
    fn untagged_serialization_is_plain_json() {
        let json = serde_json::to_string(&vec![
            FieldValue::Null,
            FieldValue::Integer(3),
            FieldValue::Number(2.5),
            FieldValue::Text("Dogs".to_string()),
        ])
        .expect("serialize");
        assert_eq!(json, r#"[null,3,2.5,"Dogs"]"#);
    }
}
