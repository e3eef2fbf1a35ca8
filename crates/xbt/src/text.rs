//! Parsing of the loosely formatted text fields in XBT records.
//!
//! Instrument strings look like `XBT: T-7 (SIPPICAN)`: a model followed by an
//! optional manufacturer in parentheses. Dates are `YYYYMMDD` digit strings.
//! Neither parser fails; unparseable input degrades to a sentinel.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Generic sentinel for a field that could not be extracted.
pub const UNKNOWN_STR: &str = "UNKNOWN";
/// Sentinel used in the source data for a probe of unknown type.
pub const UNKNOWN_MODEL_STR: &str = "TYPE UNKNOWN";
/// Sentinel used in the source data for a probe of unknown brand.
pub const UNKNOWN_MANUFACTURER_STR: &str = "UNKNOWN BRAND";

const MODEL_GROUP: &str = "model";
const MANUFACTURER_GROUP: &str = "manufacturer";

static INSTRUMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"XBT[:][\s](?P<model>[\w\s;:-]+)([\s]*)([(](?P<manufacturer>[\w\s.:;-]+)[)])?",
    )
    .expect("instrument pattern is valid")
});

/// Split an instrument string into `(model, manufacturer)`.
///
/// A missing manufacturer group yields [`UNKNOWN_STR`] for the manufacturer;
/// input that does not match at all yields [`UNKNOWN_STR`] for both.
pub fn parse_instrument(text: &str) -> (String, String) {
    match INSTRUMENT_PATTERN.captures(text) {
        Some(caps) => {
            let model = caps
                .name(MODEL_GROUP)
                .map_or(UNKNOWN_STR, |m| m.as_str());
            let manufacturer = caps
                .name(MANUFACTURER_GROUP)
                .map_or(UNKNOWN_STR, |m| m.as_str());
            (strip_spaces(model), strip_spaces(manufacturer))
        }
        None => (strip_spaces(UNKNOWN_STR), strip_spaces(UNKNOWN_STR)),
    }
}

/// The model part of an instrument string.
pub fn parse_model(text: &str) -> String {
    parse_instrument(text).0
}

/// The manufacturer part of an instrument string.
pub fn parse_manufacturer(text: &str) -> String {
    parse_instrument(text).1
}

/// Parse a `YYYYMMDD` date into `(year, month, day)`.
///
/// Returns `(0, 0, 0)` for anything that is not eight digits forming a real
/// calendar date. Loaders treat a zero year as an invalid row.
pub fn parse_observation_date(text: &str) -> (i32, u32, u32) {
    parse_yyyymmdd(text)
        .map(|date| (date.year(), date.month(), date.day()))
        .unwrap_or((0, 0, 0))
}

fn parse_yyyymmdd(text: &str) -> Option<NaiveDate> {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = text[0..4].parse().ok()?;
    let month: u32 = text[4..6].parse().ok()?;
    let day: u32 = text[6..8].parse().ok()?;
    // Year zero is not a valid calendar year here and would collide with the
    // invalid-date marker.
    if year == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn strip_spaces(s: &str) -> String {
    s.trim_matches(' ').to_string()
}
