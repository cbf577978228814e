//! Field parsers for raw CSV text.
//!
//! Every parser is total: it accepts arbitrary text or a null marker and
//! returns a typed value, null, or a policy default. None of them fail.

pub mod fields;

pub use fields::{
    FieldParser,
    coerce_numeric,
    format_currency,
    is_null_marker,
    normalize_sqft_comparison,
    parse_currency,
    parse_directional,
    parse_percentage,
    parse_sqft_comparison,
};
