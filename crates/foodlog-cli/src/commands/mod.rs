//! Command handlers

pub mod config;
pub mod entry;
pub mod status;
pub mod sync;

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};

/// Parse a timestamp given on the command line
///
/// Accepts RFC 3339 (`2026-03-01T08:00:00Z`) or a bare date
/// (`2026-03-01`), which means midnight UTC.
pub fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    bail!(
        "Invalid time '{}'. Use RFC 3339 (2026-03-01T08:00:00Z) or a date (2026-03-01).",
        value
    )
}
