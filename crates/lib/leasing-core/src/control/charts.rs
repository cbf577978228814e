//! PNG chart rendering for the market report and single charts.
//!
//! Chart data is gathered from the loaded tables into plain [`Figure`]
//! values, then drawn with `plotters` on a blocking task. Every image is
//! written to the registry's charts directory and returned base64 encoded so
//! clients can show it inline.

use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{Local, NaiveDateTime};
use leasing_store::models::Table;
use leasing_store::schema::{
    COL_CREDIT_SCORE, COL_LAST_ACTIVITY_TYPE, COL_MAX_RENT_AMOUNT, COL_MONTHLY_INCOME_AMOUNT,
    COL_PET_PREFERENCE, COL_RENT_AMOUNT, COL_RENT_COMPARISON, COL_SIMILARITY_PCT, SUBJECT_RENT,
    TABLE_GUEST_CARDS, TABLE_NEARBY_UNITS,
};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use surrealdb::Connection;
use tracing::info;

use super::guests::{NO_PETS, credit_floor};
use super::markdown::{money, money_or_missing};
use super::market::{MarketPosition, MarketSnapshot};
use super::stats::{count_by, max, mean, min, percent};
use super::{ControlError, LeasingControlPlane};

const FONT: &str = "sans-serif";
const REPORT_TITLE: &str = "Tenant Leasing Market Report";
const REPORT_NAME: &str = "market_report";
const REPORT_SIZE: (u32, u32) = (1800, 1200);
const CHART_SIZE: (u32, u32) = (1000, 600);
const REPORT_RENT_BINS: usize = 10;
const HISTOGRAM_BINS: usize = 12;

/// Brand colors followed by the light blue of the comparison scale.
const COLORS: [RGBColor; 7] = [
    RGBColor(0x2E, 0x86, 0xAB),
    RGBColor(0xA2, 0x3B, 0x72),
    RGBColor(0xF1, 0x8F, 0x01),
    RGBColor(0xC7, 0x3E, 0x1D),
    RGBColor(0x3B, 0x1F, 0x2B),
    RGBColor(0x95, 0xC6, 0x23),
    RGBColor(0x5B, 0xA8, 0xC9),
];
const MARKER_COLOR: usize = 3;

/// Price comparison tiers, cheapest first, with their bar colors.
const COMPARISON_TIERS: [(&str, usize); 5] = [
    ("Much Lower", 0),
    ("Slightly Lower", 6),
    ("Same", 5),
    ("Slightly Higher", 2),
    ("Much Higher", 3),
];

/// Credit tiers by the lower bound of the reported score.
const CREDIT_TIERS: [(f64, &str); 4] = [
    (800.0, "Excellent (800+)"),
    (740.0, "Very Good (740-799)"),
    (720.0, "Good (720-739)"),
    (660.0, "Fair (660-719)"),
];
const CREDIT_BELOW_AVERAGE: &str = "Below Average (<660)";

/// A chart `create_individual_chart` can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    RentHistogram,
    CreditPie,
    PetBar,
    BudgetHistogram,
    PriceComparison,
    ActivityPie,
    IncomeVsRent,
    SimilarityRent,
}

impl ChartKind {
    pub const ALL: [Self; 8] = [
        Self::RentHistogram,
        Self::CreditPie,
        Self::PetBar,
        Self::BudgetHistogram,
        Self::PriceComparison,
        Self::ActivityPie,
        Self::IncomeVsRent,
        Self::SimilarityRent,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RentHistogram => "rent_histogram",
            Self::CreditPie => "credit_pie",
            Self::PetBar => "pet_bar",
            Self::BudgetHistogram => "budget_histogram",
            Self::PriceComparison => "price_comparison",
            Self::ActivityPie => "activity_pie",
            Self::IncomeVsRent => "income_vs_rent",
            Self::SimilarityRent => "similarity_rent",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::RentHistogram => "Distribution of nearby rental prices",
            Self::CreditPie => "Credit score distribution of prospects",
            Self::PetBar => "Pet preferences breakdown",
            Self::BudgetHistogram => "Prospect budget distribution",
            Self::PriceComparison => "Market vs our pricing",
            Self::ActivityPie => "Prospect activity types",
            Self::IncomeVsRent => "Scatter plot of income vs max rent",
            Self::SimilarityRent => "Similarity vs rent scatter",
        }
    }

    /// Table the chart draws from.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::RentHistogram | Self::PriceComparison | Self::SimilarityRent => {
                TABLE_NEARBY_UNITS
            }
            Self::CreditPie
            | Self::PetBar
            | Self::BudgetHistogram
            | Self::ActivityPie
            | Self::IncomeVsRent => TABLE_GUEST_CARDS,
        }
    }

    fn figure(self, table: &Table) -> Figure {
        match self {
            Self::RentHistogram => rent_histogram(table, HISTOGRAM_BINS),
            Self::CreditPie => credit_pie(table),
            Self::PetBar => pet_bar(table),
            Self::BudgetHistogram => budget_histogram(table, HISTOGRAM_BINS),
            Self::PriceComparison => price_comparison(table),
            Self::ActivityPie => activity_pie(table),
            Self::IncomeVsRent => income_vs_rent(table),
            Self::SimilarityRent => similarity_rent(table),
        }
    }
}

impl FromStr for ChartKind {
    type Err = ControlError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ControlError::UnknownChart(name.to_string()))
    }
}

/// One `- name: description` line per chart type.
#[must_use]
pub fn chart_catalog() -> String {
    ChartKind::ALL.iter().fold(String::new(), |mut out, kind| {
        let _ = writeln!(out, "- {}: {}", kind.name(), kind.description());
        out
    })
}

/// A rendered image on disk and its base64 encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedChart {
    pub path: PathBuf,
    pub base64: String,
}

impl<C: Connection> LeasingControlPlane<C> {
    /// Renders the six-panel market report and summarizes its key figures.
    ///
    /// # Errors
    /// Returns `ControlError::TableAbsent` if either table is not loaded and
    /// `ControlError::ChartFailed` if the image cannot be drawn or written.
    pub async fn create_market_report(&self) -> Result<String, ControlError> {
        let units = self.require_table(TABLE_NEARBY_UNITS)?;
        let guests = self.require_table(TABLE_GUEST_CARDS)?;

        let facts = ReportFacts::of(units, guests);
        let canvas = Canvas {
            title: Some(REPORT_TITLE),
            size: REPORT_SIZE,
            layout: (2, 3),
            figures: vec![
                rent_histogram(units, REPORT_RENT_BINS),
                credit_pie(guests),
                pet_bar(guests),
                budget_histogram(guests, HISTOGRAM_BINS),
                price_comparison(units),
                activity_pie(guests),
            ],
        };
        let saved = save_chart(self.registry().charts_dir(), REPORT_NAME, canvas).await?;
        Ok(facts.render(&saved))
    }

    /// Renders one chart by name.
    ///
    /// # Errors
    /// Returns `ControlError::UnknownChart` for an unrecognized `chart_type`,
    /// `ControlError::TableAbsent` if the chart's table is not loaded, and
    /// `ControlError::ChartFailed` if the image cannot be drawn or written.
    pub async fn create_individual_chart(&self, chart_type: &str) -> Result<String, ControlError> {
        let kind: ChartKind = chart_type.parse()?;
        let table = self.require_table(kind.table())?;

        let canvas = Canvas {
            title: None,
            size: CHART_SIZE,
            layout: (1, 1),
            figures: vec![kind.figure(table)],
        };
        let saved = save_chart(self.registry().charts_dir(), kind.name(), canvas).await?;

        let mut out = format!("📊 Chart Generated: **{}**\n\n", kind.name());
        let _ = writeln!(out, "**Saved to:** `{}`\n", saved.path.display());
        let _ = writeln!(
            out,
            "![{}](data:image/png;base64,{})",
            kind.name(),
            saved.base64
        );
        Ok(out)
    }
}

/// Headline figures printed under the market report.
#[derive(Debug, Clone, PartialEq)]
struct ReportFacts {
    market: MarketSnapshot,
    prospects: usize,
    budgeted: usize,
    avg_budget: Option<f64>,
    affordable: usize,
}

impl ReportFacts {
    fn of(units: &Table, guests: &Table) -> Self {
        let budgets: Vec<f64> = guests
            .rows()
            .filter_map(|row| row.number(COL_MAX_RENT_AMOUNT))
            .collect();
        Self {
            market: MarketSnapshot::of(units),
            prospects: guests.len(),
            budgeted: budgets.len(),
            avg_budget: mean(budgets.iter().copied()),
            affordable: budgets.iter().filter(|budget| **budget >= SUBJECT_RENT).count(),
        }
    }

    fn render(&self, saved: &SavedChart) -> String {
        let mut out = String::from("## 📊 Market Report Generated\n\n");
        let _ = writeln!(out, "**Report saved to:** `{}`\n", saved.path.display());
        out.push_str("### Key Insights:\n\n#### Market Rent Analysis:\n");
        let _ = writeln!(
            out,
            "- **Market Average Rent:** {}",
            money_or_missing(self.market.avg_rent)
        );
        let _ = writeln!(out, "- **Our Rate:** {}", rate_position(self.market.avg_rent));
        let _ = writeln!(
            out,
            "- **Rent Range:** {} - {}\n",
            money_or_missing(self.market.min_rent),
            money_or_missing(self.market.max_rent)
        );
        out.push_str("#### Prospect Analysis:\n");
        let _ = writeln!(out, "- **Total Prospects:** {}", self.prospects);
        let _ = writeln!(
            out,
            "- **Average Budget:** {}",
            money_or_missing(self.avg_budget)
        );
        let _ = writeln!(
            out,
            "- **Prospects Who Can Afford Our Rate:** {} of {} with a budget ({:.1}%)\n",
            self.affordable,
            self.budgeted,
            percent(self.affordable, self.budgeted)
        );
        out.push_str(
            "#### Charts Included:\n\
             1. **Nearby Rent Distribution** - Histogram showing market rent spread\n\
             2. **Credit Score Distribution** - Pie chart of prospect credit quality\n\
             3. **Pet Preferences** - Bar chart of pet ownership\n\
             4. **Budget Distribution** - Histogram of prospect max rent budgets\n\
             5. **Market Price Comparison** - Bar chart comparing listings to our rate\n\
             6. **Activity Types** - Pie chart of prospect engagement\n\n",
        );
        let _ = writeln!(out, "![Market Report](data:image/png;base64,{})", saved.base64);
        out
    }
}

fn rate_position(avg_rent: Option<f64>) -> String {
    let rate = money(SUBJECT_RENT);
    match avg_rent.map(|average| (average, MarketPosition::of(SUBJECT_RENT, average))) {
        None => rate,
        Some((_, MarketPosition::At)) => format!("{rate} (at market avg)"),
        Some((average, position)) => format!(
            "{rate} ({} {} market avg)",
            money((average - SUBJECT_RENT).abs()),
            position.as_str()
        ),
    }
}

/// A reference line with its legend label.
#[derive(Debug, Clone, PartialEq)]
struct Marker {
    at: f64,
    label: String,
    color: usize,
}

fn our_rate() -> Marker {
    Marker {
        at: SUBJECT_RENT,
        label: format!("Our Rate ({})", money(SUBJECT_RENT)),
        color: MARKER_COLOR,
    }
}

/// A labelled count drawn as a bar or a pie slice.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slice {
    label: String,
    count: usize,
    color: usize,
}

fn slices(counts: Vec<(String, usize)>) -> Vec<Slice> {
    counts
        .into_iter()
        .enumerate()
        .map(|(index, (label, count))| Slice {
            label,
            count,
            color: index % 6,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Plot {
    Histogram {
        values: Vec<f64>,
        bins: usize,
        markers: Vec<Marker>,
    },
    Bars(Vec<Slice>),
    Pie(Vec<Slice>),
    Scatter {
        points: Vec<(f64, f64)>,
        color: usize,
        reference: Marker,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Figure {
    title: &'static str,
    x_desc: &'static str,
    y_desc: &'static str,
    plot: Plot,
}

fn rent_histogram(units: &Table, bins: usize) -> Figure {
    let values: Vec<f64> = units
        .rows()
        .filter_map(|row| row.number(COL_RENT_AMOUNT))
        .collect();
    let mut markers = vec![our_rate()];
    if let Some(average) = mean(values.iter().copied()) {
        markers.push(Marker {
            at: average,
            label: format!("Market Avg ({})", money(average)),
            color: 1,
        });
    }
    Figure {
        title: "Nearby Rent Distribution",
        x_desc: "Monthly Rent ($)",
        y_desc: "Number of Listings",
        plot: Plot::Histogram {
            values,
            bins,
            markers,
        },
    }
}

fn budget_histogram(guests: &Table, bins: usize) -> Figure {
    let values: Vec<f64> = guests
        .rows()
        .filter_map(|row| row.number(COL_MAX_RENT_AMOUNT))
        .collect();
    let mut markers = vec![our_rate()];
    if let Some(average) = mean(values.iter().copied()) {
        markers.push(Marker {
            at: average,
            label: format!("Avg Budget ({})", money(average)),
            color: 0,
        });
    }
    Figure {
        title: "Prospect Budget Distribution",
        x_desc: "Max Rent Budget ($)",
        y_desc: "Number of Prospects",
        plot: Plot::Histogram {
            values,
            bins,
            markers,
        },
    }
}

fn credit_tier(text: &str) -> &'static str {
    credit_floor(text)
        .and_then(|floor| {
            CREDIT_TIERS
                .iter()
                .find(|(bound, _)| floor >= *bound)
                .map(|(_, label)| *label)
        })
        .unwrap_or(CREDIT_BELOW_AVERAGE)
}

fn credit_pie(guests: &Table) -> Figure {
    let tiers = guests.rows().map(|row| {
        credit_tier(&row.text(COL_CREDIT_SCORE).unwrap_or_default()).to_string()
    });
    Figure {
        title: "Prospect Credit Score Distribution",
        x_desc: "",
        y_desc: "",
        plot: Plot::Pie(slices(count_by(tiers))),
    }
}

fn pet_bar(guests: &Table) -> Figure {
    let pets = guests.rows().map(|row| {
        row.text(COL_PET_PREFERENCE)
            .filter(|pet| !pet.trim().is_empty())
            .unwrap_or_else(|| NO_PETS.to_string())
    });
    Figure {
        title: "Pet Preferences",
        x_desc: "Pet Preference",
        y_desc: "Number of Prospects",
        plot: Plot::Bars(slices(count_by(pets))),
    }
}

fn activity_pie(guests: &Table) -> Figure {
    let activities = guests
        .rows()
        .map(|row| row.text(COL_LAST_ACTIVITY_TYPE).unwrap_or_default());
    Figure {
        title: "Prospect Activity Types",
        x_desc: "",
        y_desc: "",
        plot: Plot::Pie(slices(count_by(activities))),
    }
}

/// Index into `COMPARISON_TIERS` for a rent difference against our rate.
const fn comparison_tier(delta: f64) -> usize {
    if delta < -100.0 {
        0
    } else if delta < 0.0 {
        1
    } else if delta <= 0.0 {
        2
    } else if delta <= 200.0 {
        3
    } else {
        4
    }
}

fn price_comparison(units: &Table) -> Figure {
    let mut counts = [0_usize; COMPARISON_TIERS.len()];
    for row in units.rows() {
        counts[comparison_tier(row.number(COL_RENT_COMPARISON).unwrap_or(0.0))] += 1;
    }
    let bars = COMPARISON_TIERS
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|((label, color), count)| Slice {
            label: (*label).to_string(),
            count,
            color: *color,
        })
        .collect();
    Figure {
        title: "Market Price Comparison",
        x_desc: "Price vs Our Rate ($2,400)",
        y_desc: "Number of Listings",
        plot: Plot::Bars(bars),
    }
}

fn income_vs_rent(guests: &Table) -> Figure {
    let points = guests
        .rows()
        .filter_map(|row| {
            Some((
                row.number(COL_MONTHLY_INCOME_AMOUNT)?,
                row.number(COL_MAX_RENT_AMOUNT)?,
            ))
        })
        .collect();
    Figure {
        title: "Income vs Rent Budget",
        x_desc: "Monthly Income ($)",
        y_desc: "Max Rent Budget ($)",
        plot: Plot::Scatter {
            points,
            color: 0,
            reference: our_rate(),
        },
    }
}

fn similarity_rent(units: &Table) -> Figure {
    let points = units
        .rows()
        .filter_map(|row| Some((row.number(COL_SIMILARITY_PCT)?, row.number(COL_RENT_AMOUNT)?)))
        .collect();
    Figure {
        title: "Property Similarity vs Rent",
        x_desc: "Similarity to Our Property (%)",
        y_desc: "Advertised Rent ($)",
        plot: Plot::Scatter {
            points,
            color: 1,
            reference: our_rate(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bin {
    start: f64,
    end: f64,
    count: usize,
}

/// Splits `values` into `bins` equal-width bins over their range. The top
/// edge belongs to the last bin; a single distinct value gets a $100 span.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let (Some(low), Some(high)) = (min(values.iter().copied()), max(values.iter().copied()))
    else {
        return Vec::new();
    };
    let (low, high) = if high > low {
        (low, high)
    } else {
        (low - 50.0, high + 50.0)
    };
    let bins = bins.max(1);
    let width = (high - low) / bins as f64;

    let mut counts = vec![0_usize; bins];
    for value in values {
        let index = ((value - low) / width).floor() as usize;
        counts[index.min(bins - 1)] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(index, count)| Bin {
            start: (index as f64).mul_add(width, low),
            end: ((index + 1) as f64).mul_add(width, low),
            count,
        })
        .collect()
}

/// Range covering `values` and `extra` with 5% padding on each side.
fn padded_range(values: impl Iterator<Item = f64>, extra: &[f64]) -> Range<f64> {
    let values: Vec<f64> = values.chain(extra.iter().copied()).collect();
    let low = min(values.iter().copied()).unwrap_or(0.0);
    let high = max(values.iter().copied()).unwrap_or(1.0);
    let pad = if high > low { (high - low) * 0.05 } else { 50.0 };
    (low - pad)..(high + pad)
}

#[allow(clippy::cast_precision_loss)]
const fn as_f64(count: usize) -> f64 {
    count as f64
}

type DrawResult = Result<(), Box<dyn Error>>;
type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// One image: an optional heading over a grid of figures.
#[derive(Debug, Clone)]
struct Canvas {
    title: Option<&'static str>,
    size: (u32, u32),
    layout: (usize, usize),
    figures: Vec<Figure>,
}

impl Canvas {
    fn draw(&self, path: &Path) -> DrawResult {
        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let root = match self.title {
            Some(title) => root.titled(title, (FONT, 36).into_font())?,
            None => root,
        };
        for (panel, figure) in root.split_evenly(self.layout).iter().zip(&self.figures) {
            draw_figure(panel, figure)?;
        }
        root.present()?;
        Ok(())
    }
}

fn draw_figure(area: &Panel<'_>, figure: &Figure) -> DrawResult {
    match &figure.plot {
        Plot::Histogram {
            values,
            bins,
            markers,
        } => draw_histogram(area, figure, &histogram(values, *bins), markers),
        Plot::Bars(bars) => draw_bars(area, figure, bars),
        Plot::Pie(slices) => draw_pie(area, figure, slices),
        Plot::Scatter {
            points,
            color,
            reference,
        } => draw_scatter(area, figure, points, *color, reference),
    }
}

fn draw_empty(area: &Panel<'_>, title: &str) -> DrawResult {
    let inner = area.titled(title, (FONT, 22).into_font())?;
    inner.draw(&Text::new("No data", (24, 24), (FONT, 18).into_font()))?;
    Ok(())
}

fn draw_histogram(
    area: &Panel<'_>,
    figure: &Figure,
    bins: &[Bin],
    markers: &[Marker],
) -> DrawResult {
    if bins.is_empty() {
        return draw_empty(area, figure.title);
    }
    let edges = bins.iter().flat_map(|bin| [bin.start, bin.end]);
    let marks: Vec<f64> = markers.iter().map(|marker| marker.at).collect();
    let x_range = padded_range(edges, &marks);
    let peak = bins.iter().map(|bin| bin.count).max().unwrap_or(0);
    let top = as_f64(peak).mul_add(1.15, 1.0);

    let mut chart = ChartBuilder::on(area)
        .caption(figure.title, (FONT, 22).into_font())
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(48)
        .build_cartesian_2d(x_range, 0.0..top)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(figure.x_desc)
        .y_desc(figure.y_desc)
        .x_label_formatter(&|value| money(*value))
        .y_label_formatter(&|value| format!("{value:.0}"))
        .draw()?;

    chart.draw_series(bins.iter().map(|bin| {
        Rectangle::new(
            [(bin.start, 0.0), (bin.end, as_f64(bin.count))],
            COLORS[0].mix(0.8).filled(),
        )
    }))?;
    for marker in markers {
        let color = COLORS[marker.color];
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(marker.at, 0.0), (marker.at, top)],
                color.stroke_width(2),
            )))?
            .label(marker.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2)));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

fn draw_bars(area: &Panel<'_>, figure: &Figure, bars: &[Slice]) -> DrawResult {
    if bars.is_empty() {
        return draw_empty(area, figure.title);
    }
    let peak = bars.iter().map(|bar| bar.count).max().unwrap_or(0);
    let top = as_f64(peak).mul_add(1.2, 1.0);
    let width = as_f64(bars.len());

    let mut chart = ChartBuilder::on(area)
        .caption(figure.title, (FONT, 22).into_font())
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(48)
        .build_cartesian_2d(-0.5..(width - 0.5), 0.0..top)?;
    let category = |value: &f64| {
        let rounded = value.round();
        if (value - rounded).abs() > 1e-6 || rounded < 0.0 {
            return String::new();
        }
        bars.iter()
            .zip(0_u32..)
            .find(|(_, index)| (f64::from(*index) - rounded).abs() < f64::EPSILON)
            .map(|(bar, _)| bar.label.clone())
            .unwrap_or_default()
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_desc(figure.x_desc)
        .y_desc(figure.y_desc)
        .x_label_formatter(&category)
        .y_label_formatter(&|value| format!("{value:.0}"))
        .draw()?;

    chart.draw_series(bars.iter().zip(0_u32..).map(|(bar, index)| {
        let center = f64::from(index);
        Rectangle::new(
            [(center - 0.4, 0.0), (center + 0.4, as_f64(bar.count))],
            COLORS[bar.color].filled(),
        )
    }))?;
    let count_style =
        TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(bars.iter().zip(0_u32..).map(|(bar, index)| {
        Text::new(
            bar.count.to_string(),
            (f64::from(index), as_f64(bar.count) + top * 0.02),
            count_style.clone(),
        )
    }))?;
    Ok(())
}

fn draw_pie(area: &Panel<'_>, figure: &Figure, slices: &[Slice]) -> DrawResult {
    if slices.is_empty() {
        return draw_empty(area, figure.title);
    }
    let inner = area.titled(figure.title, (FONT, 22).into_font())?;
    let (width, height) = inner.dim_in_pixel();
    let center = (i32::try_from(width / 2)?, i32::try_from(height / 2)?);
    let radius = f64::from(width.min(height)) * 0.32;
    let sizes: Vec<f64> = slices.iter().map(|slice| as_f64(slice.count)).collect();
    let colors: Vec<RGBColor> = slices.iter().map(|slice| COLORS[slice.color]).collect();
    let labels: Vec<String> = slices.iter().map(|slice| slice.label.clone()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(-90.0);
    pie.label_style((FONT, 14).into_font());
    pie.percentages((FONT, 13).into_font().color(&WHITE));
    inner.draw(&pie)?;
    Ok(())
}

fn draw_scatter(
    area: &Panel<'_>,
    figure: &Figure,
    points: &[(f64, f64)],
    color: usize,
    reference: &Marker,
) -> DrawResult {
    if points.is_empty() {
        return draw_empty(area, figure.title);
    }
    let x_range = padded_range(points.iter().map(|point| point.0), &[]);
    let y_range = padded_range(points.iter().map(|point| point.1), &[reference.at]);
    let (left, right) = (x_range.start, x_range.end);

    let mut chart = ChartBuilder::on(area)
        .caption(figure.title, (FONT, 22).into_font())
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc(figure.x_desc)
        .y_desc(figure.y_desc)
        .x_label_formatter(&|value| format!("{value:.0}"))
        .y_label_formatter(&|value| money(*value))
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|point| Circle::new(*point, 5, COLORS[color].mix(0.6).filled())),
    )?;
    let line = COLORS[reference.color];
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(left, reference.at), (right, reference.at)],
            line.stroke_width(2),
        )))?
        .label(reference.label.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], line.stroke_width(2)));
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

/// `<title>_<local timestamp>.png` with every non-alphanumeric character
/// of the title replaced by `_`.
fn chart_file_name(title: &str, at: NaiveDateTime) -> String {
    let safe: String = title
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { '_' })
        .collect();
    let safe = if safe.is_empty() { "chart" } else { safe.as_str() };
    format!("{safe}_{}.png", at.format("%Y%m%d_%H%M%S_%3f"))
}

/// Draws `canvas` into `charts_dir` on a blocking task and reads the image back.
async fn save_chart(
    charts_dir: &Path,
    title: &str,
    canvas: Canvas,
) -> Result<SavedChart, ControlError> {
    let charts_dir = charts_dir.to_path_buf();
    let path = charts_dir.join(chart_file_name(title, Local::now().naive_local()));
    tokio::task::spawn_blocking(move || write_chart(&charts_dir, path, &canvas))
        .await
        .map_err(|err| ControlError::ChartFailed(err.to_string()))?
}

fn write_chart(
    charts_dir: &Path,
    path: PathBuf,
    canvas: &Canvas,
) -> Result<SavedChart, ControlError> {
    fs::create_dir_all(charts_dir).map_err(|err| {
        ControlError::ChartFailed(format!("cannot create {}: {err}", charts_dir.display()))
    })?;
    canvas
        .draw(&path)
        .map_err(|err| ControlError::ChartFailed(err.to_string()))?;
    let bytes = fs::read(&path).map_err(|err| {
        ControlError::ChartFailed(format!("cannot read {}: {err}", path.display()))
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "chart written");
    Ok(SavedChart {
        path,
        base64: STANDARD.encode(bytes),
    })
}
