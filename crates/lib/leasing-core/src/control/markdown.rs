//! Markdown rendering for report and query output.

use serde_json::{Map, Value};

use crate::parsers::format_currency;

const MISSING: &str = "n/a";

/// Pipe table with a header row; cells are escaped when rendered.
#[derive(Debug, Clone, Default)]
pub struct MarkdownTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    #[must_use]
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builds a table from JSON rows. Keys named in `leading` come first, in
    /// that order; the remaining keys follow in first-seen order.
    #[must_use]
    pub fn from_json_rows(rows: &[Map<String, Value>], leading: &[String]) -> Self {
        let present = leading
            .iter()
            .filter(|key| rows.iter().any(|row| row.contains_key(key.as_str())));
        let mut headers: Vec<String> = Vec::new();
        for key in present.chain(rows.iter().flat_map(Map::keys)) {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        let body = rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|key| row.get(key).map_or_else(String::new, json_cell))
                    .collect()
            })
            .collect();
        Self {
            headers,
            rows: body,
        }
    }

    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cells: Vec<String> = cells.into_iter().map(Into::into).collect();
        cells.resize(self.headers.len(), String::new());
        self.rows.push(cells);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        push_line(&mut out, self.headers.iter().map(String::as_str));
        push_line(&mut out, self.headers.iter().map(|_| "---"));
        for row in &self.rows {
            push_line(&mut out, row.iter().map(String::as_str));
        }
        out
    }
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    out.push('|');
    for cell in cells {
        out.push(' ');
        out.push_str(&escape_cell(cell));
        out.push_str(" |");
    }
    out.push('\n');
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Renders a JSON value as a table cell.
#[must_use]
pub fn json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

/// Whole-dollar amount, e.g. `$2,650`.
#[must_use]
pub fn money(value: f64) -> String {
    format_currency(value.round())
}

#[must_use]
pub fn money_or_missing(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), money)
}

/// Rounded to `decimals` places; `decimals == 0` also groups thousands.
#[must_use]
pub fn number_or_missing(value: Option<f64>, decimals: usize) -> String {
    match value {
        None => MISSING.to_string(),
        Some(value) if decimals == 0 => {
            let rendered = money(value);
            rendered.replacen('$', "", 1)
        }
        Some(value) => format!("{value:.decimals$}"),
    }
}
