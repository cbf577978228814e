use std::cmp::Ordering;
use std::fmt::Write as _;

use leasing_store::models::Table;
use leasing_store::schema::{
    COL_RENT_AMOUNT, COL_RENT_COMPARISON, COL_SIMILARITY_PCT, COL_SQFT, SUBJECT_RENT,
    TABLE_NEARBY_UNITS,
};
use surrealdb::Connection;

use super::markdown::{MarkdownTable, money, money_or_missing, number_or_missing};
use super::stats::{max, mean, min};
use super::{ControlError, LeasingControlPlane};

/// Upper bounds (exclusive) and labels of the rent distribution buckets.
const RENT_BUCKETS: &[(f64, &str)] = &[
    (2300.0, "Under $2,300"),
    (2500.0, "$2,300 - $2,499"),
    (2700.0, "$2,500 - $2,699"),
    (2900.0, "$2,700 - $2,899"),
];
const TOP_BUCKET: &str = "$2,900+";

/// Where a rate sits relative to the market average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketPosition {
    Below,
    At,
    Above,
}

impl MarketPosition {
    #[must_use]
    pub fn of(rate: f64, market_average: f64) -> Self {
        match rate.partial_cmp(&market_average) {
            Some(Ordering::Less) => Self::Below,
            Some(Ordering::Greater) => Self::Above,
            _ => Self::At,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Below => "below",
            Self::At => "at",
            Self::Above => "above",
        }
    }
}

/// Aggregates over the comparable listings.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MarketSnapshot {
    pub listings: usize,
    pub avg_rent: Option<f64>,
    pub min_rent: Option<f64>,
    pub max_rent: Option<f64>,
    pub avg_sqft: Option<f64>,
    pub avg_similarity: Option<f64>,
}

impl MarketSnapshot {
    pub(crate) fn of(table: &Table) -> Self {
        let rents = || table.rows().filter_map(|row| row.number(COL_RENT_AMOUNT));
        Self {
            listings: table.len(),
            avg_rent: mean(rents()),
            min_rent: min(rents()),
            max_rent: max(rents()),
            avg_sqft: mean(table.rows().filter_map(|row| row.number(COL_SQFT))),
            avg_similarity: mean(table.rows().filter_map(|row| row.number(COL_SIMILARITY_PCT))),
        }
    }
}

fn rent_bucket(rent: f64) -> (usize, &'static str) {
    RENT_BUCKETS
        .iter()
        .enumerate()
        .find(|(_, (bound, _))| rent < *bound)
        .map_or((RENT_BUCKETS.len(), TOP_BUCKET), |(index, (_, label))| (index, *label))
}

fn comparison_group(delta: f64) -> &'static str {
    if delta < 0.0 {
        "Below Our Price"
    } else if delta > 0.0 {
        "Above Our Price"
    } else {
        "Same as Our Price"
    }
}

impl<C: Connection> LeasingControlPlane<C> {
    /// Rent statistics, distribution and positioning of the comparable listings.
    ///
    /// # Errors
    /// Returns `ControlError::TableAbsent` if the nearby units table is not loaded.
    pub fn market_rent_analysis(&self) -> Result<String, ControlError> {
        let table = self.require_table(TABLE_NEARBY_UNITS)?;
        let snapshot = MarketSnapshot::of(table);

        let mut overview = MarkdownTable::new(["Metric", "Value"]);
        overview.push_row([
            "Total Comparable Listings".to_string(),
            snapshot.listings.to_string(),
        ]);
        overview.push_row([
            "Average Market Rent".to_string(),
            money_or_missing(snapshot.avg_rent),
        ]);
        overview.push_row([
            "Rent Range".to_string(),
            format!(
                "{} - {}",
                money_or_missing(snapshot.min_rent),
                money_or_missing(snapshot.max_rent)
            ),
        ]);
        overview.push_row([
            "Average Sqft".to_string(),
            number_or_missing(snapshot.avg_sqft, 0),
        ]);
        overview.push_row([
            "Average Similarity".to_string(),
            snapshot
                .avg_similarity
                .map_or_else(|| "n/a".to_string(), |value| format!("{value:.1}%")),
        ]);

        let mut out = String::from("## 📊 Market Rent Analysis\n\n");
        let _ = write!(
            out,
            "### Market Overview (Subject Property: {}):\n{}\n",
            money(SUBJECT_RENT),
            overview.render()
        );
        let _ = write!(out, "### Rent Distribution:\n{}\n", distribution(table).render());
        let _ = write!(
            out,
            "### Price Comparison vs Subject Property:\n{}\n",
            comparison(table).render()
        );

        out.push_str("### Market Position:\n");
        match snapshot.avg_rent {
            Some(average) => {
                let _ = writeln!(
                    out,
                    "Our property at {} is positioned **{}** the market average of {}.",
                    money(SUBJECT_RENT),
                    MarketPosition::of(SUBJECT_RENT, average).as_str(),
                    money(average)
                );
            }
            None => out.push_str("Market average unavailable: no listing has a parsed rent.\n"),
        }
        Ok(out)
    }
}

/// Listings per rent bucket in bucket order; listings without a rent are skipped.
fn distribution(table: &Table) -> MarkdownTable {
    let mut counts = vec![0_usize; RENT_BUCKETS.len() + 1];
    for rent in table.rows().filter_map(|row| row.number(COL_RENT_AMOUNT)) {
        counts[rent_bucket(rent).0] += 1;
    }
    let labels = RENT_BUCKETS
        .iter()
        .map(|(_, label)| *label)
        .chain(std::iter::once(TOP_BUCKET));

    let mut rendered = MarkdownTable::new(["rent_range", "count"]);
    for (label, count) in labels.zip(counts) {
        if count > 0 {
            rendered.push_row([label.to_string(), count.to_string()]);
        }
    }
    rendered
}

/// Listing counts and average rent per price comparison group, cheapest group first.
fn comparison(table: &Table) -> MarkdownTable {
    let mut groups: Vec<(&'static str, usize, Vec<f64>)> = Vec::new();
    for row in table.rows() {
        let group = comparison_group(row.number(COL_RENT_COMPARISON).unwrap_or(0.0));
        let index = groups
            .iter()
            .position(|(name, _, _)| *name == group)
            .unwrap_or_else(|| {
                groups.push((group, 0, Vec::new()));
                groups.len() - 1
            });
        let entry = &mut groups[index];
        entry.1 += 1;
        if let Some(rent) = row.number(COL_RENT_AMOUNT) {
            entry.2.push(rent);
        }
    }

    let mut averaged: Vec<(&str, usize, Option<f64>)> = groups
        .into_iter()
        .map(|(name, count, rents)| (name, count, mean(rents)))
        .collect();
    averaged.sort_by(|left, right| match (left.2, right.2) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let mut rendered = MarkdownTable::new(["comparison", "count", "avg_rent"]);
    for (name, count, average) in averaged {
        rendered.push_row([name.to_string(), count.to_string(), money_or_missing(average)]);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use leasing_store::models::{FieldValue, Record};

    use super::*;

    fn listings(rows: &[(Option<f64>, f64)]) -> Table {
        let records = rows
            .iter()
            .map(|(rent, delta)| {
                Record::new(vec![FieldValue::from(*rent), FieldValue::Number(*delta)])
            })
            .collect();
        Table::new(
            TABLE_NEARBY_UNITS,
            vec![COL_RENT_AMOUNT.to_string(), COL_RENT_COMPARISON.to_string()],
            records,
        )
    }

    #[test]
    fn buckets_split_at_exclusive_bounds() {
        assert_eq!(rent_bucket(2299.0).1, "Under $2,300");
        assert_eq!(rent_bucket(2300.0).1, "$2,300 - $2,499");
        assert_eq!(rent_bucket(2899.0).1, "$2,700 - $2,899");
        assert_eq!(rent_bucket(2900.0).1, "$2,900+");
    }

    #[test]
    fn distribution_skips_missing_rents_and_empty_buckets() {
        let table = listings(&[(Some(2650.0), 250.0), (None, 0.0), (Some(2950.0), 550.0)]);
        assert_eq!(
            distribution(&table).render(),
            "| rent_range | count |\n| --- | --- |\n| $2,500 - $2,699 | 1 |\n| $2,900+ | 1 |\n"
        );
    }

    #[test]
    fn comparison_groups_order_by_average_rent() {
        let table = listings(&[
            (Some(2650.0), 250.0),
            (Some(2200.0), -200.0),
            (Some(2400.0), 0.0),
            (Some(2850.0), 450.0),
        ]);
        assert_eq!(
            comparison(&table).render(),
            "| comparison | count | avg_rent |\n| --- | --- | --- |\n\
             | Below Our Price | 1 | $2,200 |\n\
             | Same as Our Price | 1 | $2,400 |\n\
             | Above Our Price | 2 | $2,750 |\n"
        );
    }

    #[test]
    fn position_compares_against_average() {
        assert_eq!(MarketPosition::of(2400.0, 2650.0), MarketPosition::Below);
        assert_eq!(MarketPosition::of(2400.0, 2400.0), MarketPosition::At);
        assert_eq!(MarketPosition::of(2500.0, 2400.0).as_str(), "above");
    }
}
