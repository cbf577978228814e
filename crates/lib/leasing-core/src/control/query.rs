use std::fmt::Write as _;

use leasing_store::schema::{SUBJECT_RENT, SUBJECT_SQFT};
use surrealdb::Connection;
use tracing::debug;

use super::markdown::{MarkdownTable, money};
use super::{ControlError, LeasingControlPlane};

const MUTATING_KEYWORDS: &[&str] = &[
    "CREATE", "UPDATE", "UPSERT", "DELETE", "INSERT", "RELATE", "DEFINE", "REMOVE", "ALTER", "KILL",
    "LIVE", "LET", "BEGIN", "COMMIT", "CANCEL", "USE", "SLEEP", "REBUILD", "OPTION", "THROW",
];

const NO_RESULTS: &str = "No results found.";

/// A query statement that passed the read-only guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOnlyQuery(String);

impl ReadOnlyQuery {
    /// Accepts a single `SELECT` statement with no mutating keywords outside quotes.
    ///
    /// # Errors
    /// Returns `ControlError::QueryRejected` describing the first violation found.
    pub fn parse(query: &str) -> Result<Self, ControlError> {
        let statement = query.trim();
        let words = unquoted_words(statement)?;

        match words.first() {
            Some(first) if first.eq_ignore_ascii_case("SELECT") && starts_with_select(statement) => {}
            _ => {
                return Err(ControlError::QueryRejected(
                    "Only SELECT queries are allowed.".to_string(),
                ));
            }
        }

        if let Some(keyword) = words.iter().find(|word| {
            MUTATING_KEYWORDS
                .iter()
                .any(|keyword| word.eq_ignore_ascii_case(keyword))
        }) {
            return Err(ControlError::QueryRejected(format!(
                "`{}` is not allowed in a read-only query.",
                keyword.to_ascii_uppercase()
            )));
        }

        let statement = statement.strip_suffix(';').unwrap_or(statement).trim_end();
        Ok(Self(statement.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn starts_with_select(statement: &str) -> bool {
    statement
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("SELECT"))
}

/// Splits `statement` into identifier-like words that appear outside quoted
/// strings and backtick or angle-bracket identifiers.
///
/// A `;` followed by anything other than whitespace is a second statement.
fn unquoted_words(statement: &str) -> Result<Vec<&str>, ControlError> {
    let mut words = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut closing: Option<char> = None;
    let mut escaped = false;
    let mut chars = statement.char_indices();

    while let Some((index, ch)) = chars.next() {
        if let Some(close) = closing {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == close {
                closing = None;
            }
            continue;
        }

        if ch.is_ascii_alphanumeric() || ch == '_' {
            word_start.get_or_insert(index);
            continue;
        }
        if let Some(start) = word_start.take() {
            words.push(&statement[start..index]);
        }

        match ch {
            '\'' | '"' | '`' => closing = Some(ch),
            '⟨' => closing = Some('⟩'),
            ';' => {
                if !chars.as_str().trim().is_empty() {
                    return Err(ControlError::QueryRejected(
                        "Only a single statement is allowed.".to_string(),
                    ));
                }
            }
            _ => {}
        }
    }

    if closing.is_some() {
        return Err(ControlError::QueryRejected(
            "Unterminated quoted string.".to_string(),
        ));
    }
    if let Some(start) = word_start {
        words.push(&statement[start..]);
    }
    Ok(words)
}

impl<C: Connection> LeasingControlPlane<C> {
    /// Describes both tables, their raw and derived columns, and load status.
    #[must_use]
    pub fn get_schema(&self) -> String {
        let mut out = String::from(SCHEMA_OVERVIEW);
        let _ = writeln!(out, "\n## KEY METRICS");
        let _ = writeln!(out, "- Subject property baseline rent: {}", money(SUBJECT_RENT));
        let _ = writeln!(out, "- Subject property sqft: ~{SUBJECT_SQFT:.0}");

        let _ = writeln!(out, "\n## LOAD STATUS");
        for table in self.registry().tables() {
            let _ = writeln!(out, "- {}: loaded ({} rows)", table.name(), table.len());
        }
        for absent in self.registry().absent() {
            let _ = writeln!(out, "- {}: not loaded ({})", absent.name, absent.reason);
        }
        out
    }

    /// Runs a caller-supplied read query and renders its rows.
    ///
    /// # Errors
    /// Returns `ControlError::QueryRejected` if the guard refuses the statement,
    /// or `ControlError::QueryFailed` if it fails to parse or execute.
    pub async fn query_database(&self, query: &str) -> Result<String, ControlError> {
        let query = ReadOnlyQuery::parse(query)?;
        debug!(query = query.as_str(), "running read query");
        let rows = self.registry().query(query.as_str()).await?;
        if rows.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }
        let leading = projection_columns(query.as_str()).unwrap_or_default();
        Ok(MarkdownTable::from_json_rows(&rows, &leading).render())
    }
}

/// Output names of the fields listed between `SELECT` and `FROM`, in order.
///
/// Returns `None` for `*` and `SELECT VALUE` projections. Computed fields
/// without an alias are left out and keep the store's key order.
fn projection_columns(statement: &str) -> Option<Vec<String>> {
    let body = statement.get(6..)?;
    let mut items = Vec::new();
    let mut start = 0;
    let mut end = body.len();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (index, ch) in body.char_indices() {
        if let Some(close) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == close {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '⟨' => quote = Some('⟩'),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&body[start..index]);
                start = index + ch.len_utf8();
            }
            _ if depth == 0 && keyword_at(body, index, "FROM") => {
                end = index;
                break;
            }
            _ => {}
        }
    }
    items.push(body.get(start..end)?);

    let items: Vec<&str> = items.into_iter().map(str::trim).collect();
    if items.iter().any(|item| {
        *item == "*"
            || item
                .get(..6)
                .is_some_and(|head| head.eq_ignore_ascii_case("VALUE "))
    }) {
        return None;
    }
    Some(items.into_iter().filter_map(projected_name).collect())
}

fn keyword_at(text: &str, index: usize, keyword: &str) -> bool {
    let Some(candidate) = text.get(index..index + keyword.len()) else {
        return false;
    };
    candidate.eq_ignore_ascii_case(keyword)
        && text[..index].chars().next_back().is_some_and(char::is_whitespace)
        && text[index + keyword.len()..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace)
}

fn projected_name(item: &str) -> Option<String> {
    let lower = item.to_ascii_lowercase();
    let name = lower
        .rfind(" as ")
        .map_or(item, |at| &item[at + 4..])
        .trim();
    if let Some(inner) = name.strip_prefix('`').and_then(|rest| rest.strip_suffix('`')) {
        return Some(inner.to_string());
    }
    let plain = !name.is_empty() && name.chars().all(|ch| ch.is_alphanumeric() || ch == '_');
    plain.then(|| name.to_string())
}

const SCHEMA_OVERVIEW: &str = concat!(
    "# TENANT LEASING DATABASE SCHEMA\n",
    "\n",
    "Queries are SurrealQL `SELECT` statements. Wrap column names that contain spaces or\n",
    "slashes in backticks, e.g. SELECT `Advertised Rent`, Rent_Amount FROM nearby_units.\n",
    "\n",
    "## guest_cards\n",
    "Prospective tenant inquiries and their preferences.\n",
    "\n",
    "Columns:\n",
    "- Name: Prospect name (e.g., \"Martinez, Sofia\")\n",
    "- Interest Received: Date/time of initial inquiry\n",
    "- Last Activity Date: Most recent activity date\n",
    "- Last Activity Type: Type of last activity (Email Sent, Email Received, Pre-qualification Form Submitted)\n",
    "- Status: Lead status (Active, etc.)\n",
    "- Move In Preference: Desired move-in date\n",
    "- Max Rent: Maximum rent budget as listed\n",
    "- Max_Rent_Amount: Parsed numeric max rent\n",
    "- Bed/Bath Preference: Preferred bed/bath configuration (e.g., \"2/1.00\")\n",
    "- Pet Preference: Pet type (Dogs, Cats, Other, or empty)\n",
    "- Monthly Income: Monthly income as listed\n",
    "- Monthly_Income_Amount: Parsed numeric income\n",
    "- Credit Score: Credit score range (e.g., \"720 to 799\", \"800\", \"580 to 619\")\n",
    "\n",
    "## nearby_units\n",
    "Comparable rental listings in the area.\n",
    "\n",
    "Columns:\n",
    "- Similarity: Match percentage to subject property (e.g., \"96%\")\n",
    "- Similarity_Pct: Parsed numeric similarity\n",
    "- Beds: Number of bedrooms\n",
    "- Baths: Number of bathrooms\n",
    "- Sqft: Square footage\n",
    "- Sqft Comparison: Difference vs subject property (e.g., \"▲ 35\")\n",
    "- Sqft_Comparison: Parsed numeric sqft difference\n",
    "- Location: Distance description (e.g., \"about 1 mile away\")\n",
    "- Last Advertised Date: Date listing was advertised\n",
    "- Advertised Rent: Listed rent price\n",
    "- Rent_Amount: Parsed numeric rent\n",
    "- Rent Price Comparison: Difference vs subject property (e.g., \"▲ $250\")\n",
    "- Rent_Comparison: Parsed numeric rent difference\n",
);

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(query: &str) -> String {
        match ReadOnlyQuery::parse(query) {
            Err(ControlError::QueryRejected(reason)) => reason,
            other => panic!("expected rejection for {query:?}, got {other:?}"),
        }
    }

    #[test]
    fn accepts_plain_select() {
        let query = ReadOnlyQuery::parse("  select * from guest_cards LIMIT 5; ").unwrap();
        assert_eq!(query.as_str(), "select * from guest_cards LIMIT 5");
    }

    #[test]
    fn keywords_inside_quotes_are_ignored() {
        let query = "SELECT Name FROM guest_cards WHERE `Last Activity Type` = 'Email; DELETE'";
        assert!(ReadOnlyQuery::parse(query).is_ok());
        assert!(ReadOnlyQuery::parse("SELECT * FROM guest_cards WHERE Name = \"it\\\"s UPDATE\"").is_ok());
    }

    #[test]
    fn rejects_non_select_statements() {
        assert_eq!(rejection("DELETE guest_cards"), "Only SELECT queries are allowed.");
        assert_eq!(rejection("SELECTION FROM x"), "Only SELECT queries are allowed.");
        assert_eq!(rejection(""), "Only SELECT queries are allowed.");
    }

    #[test]
    fn rejects_second_statement() {
        assert_eq!(
            rejection("SELECT * FROM guest_cards; SELECT * FROM nearby_units"),
            "Only a single statement is allowed."
        );
    }

    #[test]
    fn rejects_embedded_mutations() {
        let reason = rejection("SELECT * FROM (UPDATE guest_cards SET Status = 'x')");
        assert!(reason.contains("UPDATE"));
        assert!(rejection("SELECT * FROM guest_cards WHERE sleep(1s)").contains("SLEEP"));
    }

    #[test]
    fn projection_names_follow_select_list() {
        assert_eq!(
            projection_columns("SELECT Name, Monthly_Income_Amount FROM guest_cards"),
            Some(vec!["Name".to_string(), "Monthly_Income_Amount".to_string()])
        );
        assert_eq!(
            projection_columns(
                "select `Credit Score` AS credit, math::max([Beds, Baths]) as biggest, count() FROM guest_cards GROUP ALL"
            ),
            Some(vec!["credit".to_string(), "biggest".to_string()])
        );
        assert_eq!(
            projection_columns("SELECT `Move In Preference`, Name FROM guest_cards WHERE Name = 'a, FROM b'"),
            Some(vec!["Move In Preference".to_string(), "Name".to_string()])
        );
        assert_eq!(projection_columns("SELECT * FROM guest_cards"), None);
        assert_eq!(projection_columns("SELECT VALUE Name FROM guest_cards"), None);
    }

    #[test]
    fn rejects_unterminated_quotes() {
        assert_eq!(
            rejection("SELECT * FROM guest_cards WHERE Name = 'open"),
            "Unterminated quoted string."
        );
    }
}
