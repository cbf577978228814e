use std::fmt::Write as _;

use leasing_store::models::{Row, Table};
use leasing_store::schema::{
    COL_CREDIT_SCORE, COL_LAST_ACTIVITY_TYPE, COL_MAX_RENT_AMOUNT, COL_MONTHLY_INCOME_AMOUNT,
    COL_PET_PREFERENCE, COL_STATUS, STATUS_ACTIVE, TABLE_GUEST_CARDS, TABLE_NEARBY_UNITS,
};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;

use super::markdown::{money, money_or_missing};
use super::market::{MarketPosition, MarketSnapshot};
use super::{ControlError, LeasingControlPlane};

const ACTIVITY_EMAIL_RECEIVED: &str = "Email Received";
const ACTIVITY_PREQUALIFICATION: &str = "Pre-qualification Form Submitted";
const GOOD_CREDIT_MARKERS: [&str; 4] = ["720", "740", "800", "830"];
const INCOME_MULTIPLE: f64 = 3.0;

/// Inputs for the leasing update email; database figures are added on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeasingEmailRequest {
    pub recipient_name: String,
    pub sender_name: String,
    pub current_rate: f64,
    pub previous_rate: f64,
    pub showings_confirmed: u32,
    pub showings_attended: u32,
    pub interested_parties: u32,
    pub pending_applications: u32,
    pub withdrawn_applications: u32,
    pub upcoming_showings: u32,
}

impl Default for LeasingEmailRequest {
    fn default() -> Self {
        Self {
            recipient_name: "Chi".to_string(),
            sender_name: "Shanna".to_string(),
            current_rate: 2400.0,
            previous_rate: 2500.0,
            showings_confirmed: 4,
            showings_attended: 3,
            interested_parties: 2,
            pending_applications: 0,
            withdrawn_applications: 2,
            upcoming_showings: 2,
        }
    }
}

/// Guest card figures the email draws on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProspectStats {
    total: usize,
    recent: usize,
    active: usize,
    engaged: usize,
    prequalified: usize,
    income_qualified: usize,
    can_afford: usize,
    good_credit: usize,
    dogs: usize,
    cats: usize,
}

impl ProspectStats {
    fn of(table: &Table, current_rate: f64) -> Self {
        let total = table.len();
        let min_income = current_rate * INCOME_MULTIPLE;

        Self {
            total,
            recent: recent_estimate(total),
            active: count_rows(table, |row| text_is(row, COL_STATUS, STATUS_ACTIVE)),
            engaged: count_rows(table, |row| {
                text_is(row, COL_LAST_ACTIVITY_TYPE, ACTIVITY_EMAIL_RECEIVED)
            }),
            prequalified: count_rows(table, |row| {
                text_is(row, COL_LAST_ACTIVITY_TYPE, ACTIVITY_PREQUALIFICATION)
            }),
            income_qualified: count_rows(table, |row| {
                row.number(COL_MONTHLY_INCOME_AMOUNT)
                    .is_some_and(|income| income >= min_income)
            }),
            can_afford: count_rows(table, |row| {
                row.number(COL_MAX_RENT_AMOUNT)
                    .is_some_and(|max_rent| max_rent >= current_rate)
            }),
            good_credit: count_rows(table, |row| {
                row.text(COL_CREDIT_SCORE).is_some_and(|credit| {
                    GOOD_CREDIT_MARKERS
                        .iter()
                        .any(|marker| credit.contains(marker))
                })
            }),
            dogs: count_rows(table, |row| text_is(row, COL_PET_PREFERENCE, "Dogs")),
            cats: count_rows(table, |row| text_is(row, COL_PET_PREFERENCE, "Cats")),
        }
    }
}

fn count_rows(table: &Table, predicate: impl Fn(&Row<'_>) -> bool) -> usize {
    table.rows().filter(|row| predicate(row)).count()
}

fn text_is(row: &Row<'_>, column: &str, expected: &str) -> bool {
    row.text(column).as_deref() == Some(expected)
}

/// Roughly 17% of all inquiries, never less than one.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn recent_estimate(total: usize) -> usize {
    ((total as f64 * 0.17).floor() as usize).max(1)
}

fn rate_change(previous: f64, current: f64) -> String {
    let delta = previous - current;
    if delta > 0.0 {
        format!("Decreased by {}", money(delta))
    } else if delta < 0.0 {
        format!("Increased by {}", money(-delta))
    } else {
        "No change".to_string()
    }
}

impl<C: Connection> LeasingControlPlane<C> {
    /// Structured context for writing a leasing update email.
    ///
    /// The market average comes from the nearby units table when it is loaded.
    ///
    /// # Errors
    /// Returns `ControlError::InvalidArgument` if a rate is not finite, and
    /// `ControlError::TableAbsent` if the guest card table is not loaded.
    pub fn generate_leasing_email(
        &self,
        request: &LeasingEmailRequest,
    ) -> Result<String, ControlError> {
        if !request.current_rate.is_finite() || !request.previous_rate.is_finite() {
            return Err(ControlError::InvalidArgument(
                "current_rate and previous_rate must be finite numbers".to_string(),
            ));
        }
        let guests = self.require_table(TABLE_GUEST_CARDS)?;
        let stats = ProspectStats::of(guests, request.current_rate);
        let market_average = self
            .registry()
            .table(TABLE_NEARBY_UNITS)
            .and_then(|table| MarketSnapshot::of(table).avg_rent);
        let market_position = market_average.map_or_else(
            || "n/a".to_string(),
            |average| {
                format!(
                    "{} {} market average",
                    money((request.current_rate - average).abs()),
                    MarketPosition::of(request.current_rate, average).as_str()
                )
            },
        );
        let total_applications = request
            .pending_applications
            .saturating_add(request.withdrawn_applications);

        let mut out = String::from("## Email Context & Data\n\n");
        let _ = write!(
            out,
            "**Recipients:**\n- To: {}\n- From: {}\n\n",
            request.recipient_name, request.sender_name
        );
        let _ = write!(
            out,
            "**Pricing:**\n- Current Rate: {}\n- Previous Rate: {}\n- Rate Change: {}\n\
             - Market Average: {}\n- Market Position: {}\n\n",
            money(request.current_rate),
            money(request.previous_rate),
            rate_change(request.previous_rate, request.current_rate),
            money_or_missing(market_average),
            market_position
        );
        let _ = write!(
            out,
            "**Guest Card Stats (from database):**\n- Total Inquiries: {}\n- New This Week: ~{}\n\
             - Active Prospects: {}\n- Engaged (responded to emails): {}\n\
             - Pre-qualification Forms Submitted: {}\n\n",
            stats.total, stats.recent, stats.active, stats.engaged, stats.prequalified
        );
        let _ = write!(
            out,
            "**Prospect Quality:**\n- Income Qualified (3x rent = {}+): {}\n\
             - Can Afford {} Rent: {}\n- Good Credit (720+): {}\n- Have Dogs: {}\n- Have Cats: {}\n\n",
            money(request.current_rate * INCOME_MULTIPLE),
            stats.income_qualified,
            money(request.current_rate),
            stats.can_afford,
            stats.good_credit,
            stats.dogs,
            stats.cats
        );
        let _ = write!(
            out,
            "**Showing Activity (user provided):**\n- Showings Confirmed: {}\n\
             - Showings Attended: {}\n- Interested Parties: {}\n- Upcoming Showings: {}\n\n",
            request.showings_confirmed,
            request.showings_attended,
            request.interested_parties,
            request.upcoming_showings
        );
        let _ = write!(
            out,
            "**Applications:**\n- Pending: {}\n- Withdrawn: {}\n- Total to Date: {}\n\n---\n\n",
            request.pending_applications, request.withdrawn_applications, total_applications
        );
        let _ = write!(
            out,
            "**INSTRUCTION:** Using the data above, write a natural, conversational email from \
             {} to {}.\n\
             - Sound like a real person, not a template\n\
             - Be concise but warm\n\
             - Include the key metrics naturally woven into sentences\n\
             - Mention any challenges honestly but with a positive outlook\n\
             - End with clear next steps",
            request.sender_name, request.recipient_name
        );
        Ok(out)
    }
}
