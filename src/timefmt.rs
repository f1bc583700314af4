// src/timefmt.rs
//! Alpha Vantage timestamp handling.
//!
//! The NEWS_SENTIMENT endpoint takes its `time_from` bound in a compact
//! `YYYYMMDDThhmm` form (UTC, minute resolution, no separators).

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

pub const AV_TIME_FORMAT: &str = "%Y%m%dT%H%M";

/// Render a UTC instant in the compact Alpha Vantage form.
pub fn format_av_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(AV_TIME_FORMAT).to_string()
}

/// Parse a compact Alpha Vantage timestamp back into a UTC instant.
/// Returns `None` for anything that does not match the expected shape.
pub fn parse_av_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, AV_TIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
