use std::sync::LazyLock;

use regex::Regex;

pub const GLYPH_INCREASE: char = '▲';
pub const GLYPH_DECREASE: char = '▼';

const NULL_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "#N/A",
];

/// Glyph, optional whitespace and `$`, then the magnitude. Only ASCII digits
/// count toward the magnitude, so other Unicode digits leave the text unmatched.
static COMPARISON_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([▲▼])\s*\$?([0-9]+)").expect("comparison pattern compiles")
});

/// Parser applied to a source column to produce a derived column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldParser {
    /// `$2,650` style amounts. Null and malformed text map to null.
    Currency,
    /// `96%` style values. Null and malformed text map to null.
    Percentage,
    /// `▲ $250` / `▼ $100` comparisons. Anything unmatched maps to zero.
    Directional,
    /// `▲ 35` square-footage comparisons, normalized before the directional parse.
    SqftComparison,
    /// Plain numeric text; any conversion failure maps to null.
    Numeric,
}

impl FieldParser {
    /// Applies the parser to one raw field.
    #[must_use]
    pub fn parse(self, raw: Option<&str>) -> Option<f64> {
        let raw = raw.filter(|value| !is_null_marker(value));
        match self {
            Self::Currency => parse_currency(raw),
            Self::Percentage => parse_percentage(raw),
            Self::Directional => Some(parse_directional(raw)),
            Self::SqftComparison => Some(parse_sqft_comparison(raw)),
            Self::Numeric => coerce_numeric(raw),
        }
    }

    /// True when non-null text failed to produce a value.
    ///
    /// Directional parsers never report malformed input: unmatched text is
    /// read as "no difference".
    #[must_use]
    pub fn is_malformed(self, raw: Option<&str>, parsed: Option<f64>) -> bool {
        let present = raw.is_some_and(|value| !is_null_marker(value));
        match self {
            Self::Currency | Self::Percentage | Self::Numeric => present && parsed.is_none(),
            Self::Directional | Self::SqftComparison => false,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Currency => "currency",
            Self::Percentage => "percentage",
            Self::Directional => "directional",
            Self::SqftComparison => "sqft_comparison",
            Self::Numeric => "numeric",
        }
    }
}

/// Returns true for empty text and the conventional missing-value tokens.
#[must_use]
pub fn is_null_marker(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || NULL_TOKENS.contains(&trimmed)
}

/// Parses `$2,650`-style amounts.
///
/// One leading `$` (optionally after a sign) and every `,` are removed before
/// the decimal parse.
#[must_use]
pub fn parse_currency(raw: Option<&str>) -> Option<f64> {
    let trimmed = raw?.trim();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest.trim_start()),
        None => ("", trimmed.strip_prefix('+').unwrap_or(trimmed).trim_start()),
    };
    let rest = rest.strip_prefix('$').unwrap_or(rest);
    let cleaned: String = rest.chars().filter(|ch| *ch != ',').collect();
    parse_decimal(&format!("{sign}{}", cleaned.trim()))
}

/// Parses `96%`-style values.
#[must_use]
pub fn parse_percentage(raw: Option<&str>) -> Option<f64> {
    let trimmed = raw?.trim();
    let value = trimmed.strip_suffix('%').unwrap_or(trimmed);
    parse_decimal(value.trim())
}

/// Parses the first `▲ $250` / `▼ $100` comparison found in the text.
///
/// Null text, text without a glyph, and a glyph without trailing digits all
/// read as zero.
#[must_use]
pub fn parse_directional(raw: Option<&str>) -> f64 {
    let Some(text) = raw else {
        return 0.0;
    };
    let Some(captures) = COMPARISON_PATTERN.captures(text) else {
        return 0.0;
    };
    let magnitude = captures
        .get(2)
        .and_then(|digits| digits.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    let sign = match captures.get(1).and_then(|glyph| glyph.as_str().chars().next()) {
        Some(GLYPH_DECREASE) => -1.0,
        _ => 1.0,
    };
    sign * magnitude
}

/// Rewrites square-footage comparisons into the rent comparison shape.
///
/// `▲ 35` and `▲35` both become `▲ $35`.
#[must_use]
pub fn normalize_sqft_comparison(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len() + 4);
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        normalized.push(ch);
        if ch == GLYPH_INCREASE || ch == GLYPH_DECREASE {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
            normalized.push_str(" $");
        }
    }
    normalized
}

#[must_use]
pub fn parse_sqft_comparison(raw: Option<&str>) -> f64 {
    raw.map_or(0.0, |text| {
        parse_directional(Some(&normalize_sqft_comparison(text)))
    })
}

/// Permissive numeric coercion; never fails, returns null instead.
#[must_use]
pub fn coerce_numeric(raw: Option<&str>) -> Option<f64> {
    parse_decimal(raw?.trim())
}

/// Formats an amount in the `$2,650` convention `parse_currency` accepts.
#[must_use]
pub fn format_currency(value: f64) -> String {
    let sign = if value.is_sign_negative() && value != 0.0 {
        "-"
    } else {
        ""
    };
    let plain = value.abs().to_string();
    let (whole, fraction) = plain
        .split_once('.')
        .map_or((plain.as_str(), None), |(whole, fraction)| (whole, Some(fraction)));
    let grouped = group_thousands(whole);
    match fraction {
        Some(fraction) => format!("{sign}${grouped}.{fraction}"),
        None => format!("{sign}${grouped}"),
    }
}

pub(crate) fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn parse_decimal(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}
