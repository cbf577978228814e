//! Table loader for the leasing CSV exports.
//!
//! Reads a headered CSV source, keeps every source column, and appends the
//! derived columns configured in a [`TableSpec`].

use std::{
    error::Error,
    fmt,
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use csv::{ByteRecord, ReaderBuilder};
use leasing_store::models::{FieldValue, Record, Table};
use leasing_store::schema::{
    COL_ADVERTISED_RENT,
    COL_CREDIT_SCORE,
    COL_MAX_RENT,
    COL_MAX_RENT_AMOUNT,
    COL_MONTHLY_INCOME,
    COL_MONTHLY_INCOME_AMOUNT,
    COL_RENT_AMOUNT,
    COL_RENT_COMPARISON,
    COL_RENT_PRICE_COMPARISON,
    COL_SIMILARITY,
    COL_SIMILARITY_PCT,
    COL_SQFT_COMPARISON,
    COL_SQFT_COMPARISON_DELTA,
    SOURCE_GUEST_CARDS,
    SOURCE_NEARBY_UNITS,
    TABLE_GUEST_CARDS,
    TABLE_NEARBY_UNITS,
};
use tracing::debug;

use crate::parsers::{FieldParser, is_null_marker};

/// A derived column computed from one source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedColumn {
    pub source: &'static str,
    pub name: &'static str,
    pub parser: FieldParser,
}

impl DerivedColumn {
    #[must_use]
    pub const fn new(source: &'static str, name: &'static str, parser: FieldParser) -> Self {
        Self {
            source,
            name,
            parser,
        }
    }
}

/// Fixed description of one source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub file_name: &'static str,
    pub derived: &'static [DerivedColumn],
    /// Source columns kept as text even when every value looks numeric.
    pub text_columns: &'static [&'static str],
}

pub const GUEST_CARDS_SPEC: TableSpec = TableSpec {
    name: TABLE_GUEST_CARDS,
    file_name: SOURCE_GUEST_CARDS,
    derived: &[
        DerivedColumn::new(COL_MAX_RENT, COL_MAX_RENT_AMOUNT, FieldParser::Numeric),
        DerivedColumn::new(
            COL_MONTHLY_INCOME,
            COL_MONTHLY_INCOME_AMOUNT,
            FieldParser::Numeric,
        ),
    ],
    // Either a single score or a range such as "580 to 619".
    text_columns: &[COL_CREDIT_SCORE],
};

pub const NEARBY_UNITS_SPEC: TableSpec = TableSpec {
    name: TABLE_NEARBY_UNITS,
    file_name: SOURCE_NEARBY_UNITS,
    derived: &[
        DerivedColumn::new(COL_SIMILARITY, COL_SIMILARITY_PCT, FieldParser::Percentage),
        DerivedColumn::new(COL_ADVERTISED_RENT, COL_RENT_AMOUNT, FieldParser::Currency),
        DerivedColumn::new(
            COL_RENT_PRICE_COMPARISON,
            COL_RENT_COMPARISON,
            FieldParser::Directional,
        ),
        DerivedColumn::new(
            COL_SQFT_COMPARISON,
            COL_SQFT_COMPARISON_DELTA,
            FieldParser::SqftComparison,
        ),
    ],
    text_columns: &[],
};

/// The two leasing sources, in registration order.
pub const DEFAULT_SPECS: [TableSpec; 2] = [NEARBY_UNITS_SPEC, GUEST_CARDS_SPEC];

#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    Csv(csv::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read source: {err}"),
            Self::Csv(err) => write!(f, "failed to decode CSV: {err}"),
        }
    }
}

impl Error for LoadError {}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Per-column count of non-null fields a parser could not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedCount {
    pub column: String,
    pub parser: FieldParser,
    pub count: usize,
}

/// Summary of a single table load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    pub rows: usize,
    pub columns: usize,
    pub malformed: Vec<MalformedCount>,
    /// Records whose field count differed from the header.
    pub ragged_rows: usize,
    /// Configured source columns missing from the header.
    pub missing_sources: Vec<String>,
}

impl LoadReport {
    #[must_use]
    pub fn malformed_total(&self) -> usize {
        self.malformed.iter().map(|entry| entry.count).sum()
    }
}

/// Result of loading one source.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The source file does not exist.
    Absent { path: PathBuf },
    Loaded { table: Table, report: LoadReport },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

/// Loader that materializes a [`TableSpec`] from CSV.
pub struct TableLoader;

impl TableLoader {
    /// Loads `spec` from `path`.
    ///
    /// # Errors
    /// Returns `LoadError` if the file exists but cannot be read or decoded.
    pub fn load(path: &Path, spec: &TableSpec) -> Result<LoadOutcome, LoadError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(LoadOutcome::Absent {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => return Err(LoadError::Io(err)),
        };
        let (table, report) = Self::from_reader(file, spec)?;
        Ok(LoadOutcome::Loaded { table, report })
    }

    /// Loads `spec` from `<data_dir>/<spec.file_name>`.
    ///
    /// # Errors
    /// Returns `LoadError` if the file exists but cannot be read or decoded.
    pub fn load_from_dir(data_dir: &Path, spec: &TableSpec) -> Result<LoadOutcome, LoadError> {
        Self::load(&data_dir.join(spec.file_name), spec)
    }

    /// Loads `spec` from any CSV reader.
    ///
    /// # Errors
    /// Returns `LoadError` if the header or a record cannot be decoded.
    pub fn from_reader<R: Read>(
        reader: R,
        spec: &TableSpec,
    ) -> Result<(Table, LoadReport), LoadError> {
        let mut csv = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = dedupe_headers(csv.byte_headers()?);
        let width = headers.len();

        let mut report = LoadReport {
            table: spec.name.to_string(),
            ..LoadReport::default()
        };

        let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
        let mut record = ByteRecord::new();
        while csv.read_byte_record(&mut record)? {
            if record.len() != width {
                report.ragged_rows += 1;
            }
            let row = (0..width)
                .map(|index| {
                    record
                        .get(index)
                        .map(|field| String::from_utf8_lossy(field).into_owned())
                        .filter(|value| !is_null_marker(value))
                })
                .collect();
            raw_rows.push(row);
        }

        let kinds: Vec<ColumnKind> = headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                if spec.text_columns.contains(&header.as_str()) {
                    ColumnKind::Text
                } else {
                    infer_kind(raw_rows.iter().filter_map(|row| row[index].as_deref()))
                }
            })
            .collect();

        let mut columns = headers.clone();
        let mut targets = Vec::with_capacity(spec.derived.len());
        for derived in spec.derived {
            let source = headers.iter().position(|header| header == derived.source);
            if source.is_none() {
                report.missing_sources.push(derived.source.to_string());
            }
            let target = columns.iter().position(|column| column == derived.name);
            let target = target.unwrap_or_else(|| {
                columns.push(derived.name.to_string());
                columns.len() - 1
            });
            targets.push((derived, source, target));
        }

        let mut malformed = vec![0_usize; targets.len()];
        let records = raw_rows
            .iter()
            .map(|row| {
                let mut values: Vec<FieldValue> = row
                    .iter()
                    .zip(kinds.iter())
                    .map(|(raw, kind)| convert_raw(raw.as_deref(), *kind))
                    .collect();
                values.resize(columns.len(), FieldValue::Null);
                for (slot, &(derived, source, target)) in targets.iter().enumerate() {
                    let raw = source.and_then(|index| row[index].as_deref());
                    let parsed = derived.parser.parse(raw);
                    if derived.parser.is_malformed(raw, parsed) {
                        malformed[slot] += 1;
                    }
                    values[target] = FieldValue::from_option(parsed);
                }
                Record::new(values)
            })
            .collect::<Vec<_>>();

        report.malformed = targets
            .iter()
            .zip(malformed)
            .filter(|(_, count)| *count > 0)
            .map(|((derived, _, _), count)| MalformedCount {
                column: derived.name.to_string(),
                parser: derived.parser,
                count,
            })
            .collect();
        report.rows = records.len();
        report.columns = columns.len();

        debug!(
            table = spec.name,
            rows = report.rows,
            columns = report.columns,
            "materialized table"
        );

        Ok((Table::new(spec.name, columns, records), report))
    }
}

fn dedupe_headers(headers: &ByteRecord) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(headers.len());
    for (index, field) in headers.iter().enumerate() {
        let mut name = String::from_utf8_lossy(field).into_owned();
        if index == 0 {
            name = name.trim_start_matches('\u{feff}').to_string();
        }
        let base = name.clone();
        let mut suffix = 1;
        while names.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        names.push(name);
    }
    names
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    let mut seen = false;
    for value in values {
        seen = true;
        let value = value.trim();
        if kind == ColumnKind::Integer && value.parse::<i64>().is_err() {
            kind = ColumnKind::Float;
        }
        if kind == ColumnKind::Float
            && !value.parse::<f64>().is_ok_and(f64::is_finite)
        {
            return ColumnKind::Text;
        }
    }
    if seen { kind } else { ColumnKind::Text }
}

fn convert_raw(raw: Option<&str>, kind: ColumnKind) -> FieldValue {
    let Some(raw) = raw else {
        return FieldValue::Null;
    };
    match kind {
        ColumnKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map_or_else(|_| FieldValue::Text(raw.to_string()), FieldValue::Integer),
        ColumnKind::Float => raw
            .trim()
            .parse::<f64>()
            .map_or_else(|_| FieldValue::Text(raw.to_string()), FieldValue::Number),
        ColumnKind::Text => FieldValue::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNITS_CSV: &str = "\
Similarity,Beds,Baths,Sqft,Sqft Comparison,Location,Last Advertised Date,Advertised Rent,Rent Price Comparison
96%,2,1,950,▲ 35,about 1 mile away,2025-01-02,\"$2,650\",▲ $250
88%,2,1.5,880,▼ 35,about 2 miles away,2025-01-05,\"$2,300\",▼ $100
,1,1,,,nearby,,,
";

    fn load_units(csv: &str) -> (Table, LoadReport) {
        TableLoader::from_reader(csv.as_bytes(), &NEARBY_UNITS_SPEC).expect("load units")
    }

    #[test]
    fn derived_columns_follow_their_sources() {
        let (table, report) = load_units(UNITS_CSV);
        assert_eq!(report.rows, 3);
        let first = table.row(0).expect("row");
        assert_eq!(first.number(COL_RENT_AMOUNT), Some(2650.0));
        assert_eq!(first.number(COL_RENT_COMPARISON), Some(250.0));
        assert_eq!(first.number(COL_SIMILARITY_PCT), Some(96.0));
        assert_eq!(first.number(COL_SQFT_COMPARISON_DELTA), Some(35.0));
        assert_eq!(
            first.get(COL_ADVERTISED_RENT),
            &FieldValue::Text("$2,650".to_string())
        );

        let second = table.row(1).expect("row");
        assert_eq!(second.number(COL_RENT_COMPARISON), Some(-100.0));
        assert_eq!(second.number(COL_SQFT_COMPARISON_DELTA), Some(-35.0));
    }

    #[test]
    fn missing_fields_map_per_parser_policy() {
        let (table, report) = load_units(UNITS_CSV);
        let blank = table.row(2).expect("row");
        assert!(blank.get(COL_RENT_AMOUNT).is_null());
        assert!(blank.get(COL_SIMILARITY_PCT).is_null());
        assert_eq!(blank.number(COL_RENT_COMPARISON), Some(0.0));
        assert_eq!(blank.number(COL_SQFT_COMPARISON_DELTA), Some(0.0));
        assert_eq!(report.malformed_total(), 0);
    }

    #[test]
    fn raw_columns_get_one_kind_per_column() {
        let (table, _) = load_units(UNITS_CSV);
        let first = table.row(0).expect("row");
        assert_eq!(first.get("Beds"), &FieldValue::Integer(2));
        assert_eq!(first.get("Baths"), &FieldValue::Number(1.0));
        assert_eq!(first.get("Sqft"), &FieldValue::Integer(950));
        assert_eq!(
            first.get("Location"),
            &FieldValue::Text("about 1 mile away".to_string())
        );
    }

    #[test]
    fn pinned_text_columns_stay_text() {
        let csv = "Name,Max Rent,Monthly Income,Credit Score\nA,2500,8000,800\nB,abc,,720\n";
        let (table, report) =
            TableLoader::from_reader(csv.as_bytes(), &GUEST_CARDS_SPEC).expect("load guests");
        let first = table.row(0).expect("row");
        assert_eq!(first.get(COL_CREDIT_SCORE), &FieldValue::Text("800".to_string()));
        assert_eq!(first.number(COL_MAX_RENT_AMOUNT), Some(2500.0));

        let second = table.row(1).expect("row");
        assert!(second.get(COL_MAX_RENT_AMOUNT).is_null());
        assert!(second.get(COL_MONTHLY_INCOME_AMOUNT).is_null());
        assert_eq!(report.malformed_total(), 1);
        assert_eq!(report.malformed[0].column, COL_MAX_RENT_AMOUNT);
    }

    #[test]
    fn formatted_amounts_in_numeric_columns_are_null() {
        let csv = "Name,Max Rent,Monthly Income,Credit Score\nA,\"$2,400\",7200,700\nB,N/A,8000,720\n";
        let (table, report) =
            TableLoader::from_reader(csv.as_bytes(), &GUEST_CARDS_SPEC).expect("load guests");

        let first = table.row(0).expect("row");
        assert!(first.get(COL_MAX_RENT_AMOUNT).is_null());
        assert_eq!(first.number(COL_MONTHLY_INCOME_AMOUNT), Some(7200.0));
        assert!(table.row(1).expect("row").get(COL_MAX_RENT_AMOUNT).is_null());
        assert_eq!(report.malformed_total(), 1);
    }

    #[test]
    fn ragged_rows_are_padded_and_counted() {
        let csv = "Similarity,Advertised Rent\n90%\n91%,$100,extra\n";
        let (table, report) = load_units(csv);
        assert_eq!(report.ragged_rows, 2);
        assert_eq!(table.len(), 2);
        assert!(table.row(0).expect("row").get(COL_RENT_AMOUNT).is_null());
        assert_eq!(table.row(1).expect("row").number(COL_RENT_AMOUNT), Some(100.0));
    }

    #[test]
    fn missing_source_columns_still_produce_derived_columns() {
        let csv = "Similarity\n90%\n";
        let (table, report) = load_units(csv);
        assert!(table.has_column(COL_RENT_COMPARISON));
        assert!(report.missing_sources.contains(&COL_ADVERTISED_RENT.to_string()));
        assert_eq!(table.row(0).expect("row").number(COL_RENT_COMPARISON), Some(0.0));
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let csv = "Location,Location,Location\na,b,c\n";
        let (table, _) = load_units(csv);
        assert_eq!(&table.columns()[..3], ["Location", "Location.1", "Location.2"]);
    }

    #[test]
    fn absent_file_is_not_an_error() {
        let outcome = TableLoader::load(Path::new("no/such/units.csv"), &NEARBY_UNITS_SPEC)
            .expect("absent is not an error");
        assert!(matches!(outcome, LoadOutcome::Absent { .. }));
    }
}
