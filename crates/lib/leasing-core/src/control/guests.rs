use std::fmt::Write as _;

use leasing_store::models::Row;
use leasing_store::schema::{
    COL_CREDIT_SCORE, COL_LAST_ACTIVITY_TYPE, COL_MAX_RENT_AMOUNT, COL_MONTHLY_INCOME_AMOUNT,
    COL_MOVE_IN_PREFERENCE, COL_NAME, COL_PET_PREFERENCE, COL_STATUS, STATUS_ACTIVE,
    TABLE_GUEST_CARDS,
};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;

use super::markdown::{MarkdownTable, money, money_or_missing};
use super::stats::{count_by, max, mean, min, percent};
use super::{ControlError, LeasingControlPlane};

pub(crate) const NO_PETS: &str = "No Pets";
const DEFAULT_MIN_INCOME: f64 = 7200.0;
const DEFAULT_MIN_CREDIT: &str = "660";

/// Thresholds a prospect must meet to qualify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProspectCriteria {
    /// Minimum monthly income.
    pub min_income: f64,
    /// Minimum credit score; the first number in the text is used.
    pub min_credit: String,
}

impl Default for ProspectCriteria {
    fn default() -> Self {
        Self {
            min_income: DEFAULT_MIN_INCOME,
            min_credit: DEFAULT_MIN_CREDIT.to_string(),
        }
    }
}

/// Lower bound of a credit score cell such as `720 to 799` or `800`.
#[must_use]
pub fn credit_floor(text: &str) -> Option<f64> {
    let start = text.find(|ch: char| ch.is_ascii_digit())?;
    let digits = &text[start..];
    let end = digits
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<f64>().ok()
}

impl<C: Connection> LeasingControlPlane<C> {
    /// Totals, budget overview and breakdowns over every guest card.
    ///
    /// # Errors
    /// Returns `ControlError::TableAbsent` if the guest card table is not loaded.
    pub fn guest_card_summary(&self) -> Result<String, ControlError> {
        let table = self.require_table(TABLE_GUEST_CARDS)?;
        let budgeted: Vec<Row<'_>> = table
            .rows()
            .filter(|row| row.number(COL_MAX_RENT_AMOUNT).is_some())
            .collect();
        let max_rents = || budgeted.iter().filter_map(|row| row.number(COL_MAX_RENT_AMOUNT));
        let incomes = budgeted
            .iter()
            .filter_map(|row| row.number(COL_MONTHLY_INCOME_AMOUNT));

        let mut overview = MarkdownTable::new(["Metric", "Value"]);
        overview.push_row(["Total Inquiries".to_string(), table.len().to_string()]);
        overview.push_row([
            "Avg Max Rent Budget".to_string(),
            money_or_missing(mean(max_rents())),
        ]);
        overview.push_row(["Avg Monthly Income".to_string(), money_or_missing(mean(incomes))]);
        overview.push_row([
            "Budget Range".to_string(),
            format!(
                "{} - {}",
                money_or_missing(min(max_rents())),
                money_or_missing(max(max_rents()))
            ),
        ]);

        let activity = breakdown(
            "activity_type",
            table.rows().map(|row| row.text(COL_LAST_ACTIVITY_TYPE).unwrap_or_default()),
        );
        let pets = breakdown(
            "pet_type",
            table.rows().map(|row| {
                row.text(COL_PET_PREFERENCE)
                    .filter(|pet| !pet.trim().is_empty())
                    .unwrap_or_else(|| NO_PETS.to_string())
            }),
        );
        let credit = breakdown(
            "credit_range",
            table.rows().map(|row| row.text(COL_CREDIT_SCORE).unwrap_or_default()),
        );

        let mut out = String::from("## 📋 Guest Card Summary\n\n");
        let _ = write!(out, "### Overview:\n{}\n", overview.render());
        let _ = write!(out, "### Activity Breakdown:\n{}\n", activity.render());
        let _ = write!(out, "### Pet Preferences:\n{}\n", pets.render());
        let _ = write!(out, "### Credit Score Distribution:\n{}", credit.render());
        Ok(out)
    }

    /// Active prospects meeting the income and credit thresholds, highest income first.
    ///
    /// # Errors
    /// Returns `ControlError::InvalidArgument` if `min_credit` holds no number or
    /// `min_income` is not finite, and `ControlError::TableAbsent` if the guest
    /// card table is not loaded.
    pub fn qualified_prospects(&self, criteria: &ProspectCriteria) -> Result<String, ControlError> {
        if !criteria.min_income.is_finite() {
            return Err(ControlError::InvalidArgument(
                "min_income must be a finite number".to_string(),
            ));
        }
        let min_credit = credit_floor(&criteria.min_credit).ok_or_else(|| {
            ControlError::InvalidArgument(format!(
                "min_credit must contain a credit score, got {:?}",
                criteria.min_credit
            ))
        })?;
        let table = self.require_table(TABLE_GUEST_CARDS)?;

        let mut qualified: Vec<(f64, Row<'_>)> = table
            .rows()
            .filter(|row| row.text(COL_STATUS).as_deref() == Some(STATUS_ACTIVE))
            .filter(|row| {
                row.text(COL_CREDIT_SCORE)
                    .as_deref()
                    .and_then(credit_floor)
                    .is_some_and(|floor| floor >= min_credit)
            })
            .filter_map(|row| {
                row.number(COL_MONTHLY_INCOME_AMOUNT)
                    .filter(|income| *income >= criteria.min_income)
                    .map(|income| (income, row))
            })
            .collect();
        qualified.sort_by(|left, right| right.0.total_cmp(&left.0));

        let mut listing = MarkdownTable::new([
            "Name",
            "move_in",
            "max_rent",
            "income",
            "credit",
            "pets",
            "last_activity",
        ]);
        for (income, row) in &qualified {
            listing.push_row([
                row.text(COL_NAME).unwrap_or_default(),
                row.text(COL_MOVE_IN_PREFERENCE).unwrap_or_default(),
                money_or_missing(row.number(COL_MAX_RENT_AMOUNT)),
                money(*income),
                row.text(COL_CREDIT_SCORE).unwrap_or_default(),
                row.text(COL_PET_PREFERENCE).unwrap_or_default(),
                row.text(COL_LAST_ACTIVITY_TYPE).unwrap_or_default(),
            ]);
        }

        let mut out = String::from("## ✅ Qualified Prospects\n\n### Criteria:\n");
        let _ = writeln!(out, "- Minimum Income: {}/month", money(criteria.min_income));
        let _ = writeln!(out, "- Minimum Credit Score: {min_credit:.0}");
        let _ = writeln!(out, "- Status: {STATUS_ACTIVE}\n");
        let _ = writeln!(
            out,
            "### Results: {} of {} prospects qualify ({:.1}%)\n",
            qualified.len(),
            table.len(),
            percent(qualified.len(), table.len())
        );
        if listing.is_empty() {
            out.push_str("No prospects match these criteria.\n");
        } else {
            out.push_str(&listing.render());
        }
        Ok(out)
    }
}

fn breakdown(label: &str, values: impl Iterator<Item = String>) -> MarkdownTable {
    let mut table = MarkdownTable::new([label, "count"]);
    for (value, count) in count_by(values) {
        table.push_row([value, count.to_string()]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_floor_reads_first_number() {
        assert_eq!(credit_floor("720 to 799"), Some(720.0));
        assert_eq!(credit_floor("800"), Some(800.0));
        assert_eq!(credit_floor(" 580 to 619 "), Some(580.0));
        assert_eq!(credit_floor("unknown"), None);
        assert_eq!(credit_floor(""), None);
    }

    #[test]
    fn criteria_defaults_fill_missing_fields() {
        let criteria: ProspectCriteria = serde_json::from_str(r#"{"min_income": 6000}"#).unwrap();
        assert!((criteria.min_income - 6000.0).abs() < f64::EPSILON);
        assert_eq!(criteria.min_credit, "660");
        assert!((ProspectCriteria::default().min_income - 7200.0).abs() < f64::EPSILON);
    }
}
