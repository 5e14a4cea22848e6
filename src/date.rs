//! Normalization of WHOIS creation-date strings.
//!
//! Registries append all kinds of annotations after the date (reference ids,
//! timezone names, registrar notes). Only the first whitespace-delimited
//! token is considered, and it is matched against a short, ordered list of
//! layouts. The most specific layout is tried first so a looser one never
//! claims a partial match.

use crate::errors::CheckError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

/// Layouts accepted for a creation date, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateLayout {
    /// 2024-01-15T00:00:00Z (fractional seconds tolerated)
    UtcTimestamp,
    /// 2024-01-15
    Dashed,
    /// 20240115
    Compact,
}

const LAYOUTS: [DateLayout; 3] = [DateLayout::UtcTimestamp, DateLayout::Dashed, DateLayout::Compact];

impl DateLayout {
    fn parse(&self, token: &str) -> Option<DateTime<Utc>> {
        match self {
            DateLayout::UtcTimestamp => {
                if !is_fixed_width_timestamp(token) {
                    return None;
                }
                NaiveDateTime::parse_from_str(token, "%Y-%m-%dT%H:%M:%S%.fZ")
                    .ok()
                    .map(|naive| naive.and_utc())
            }
            DateLayout::Dashed => {
                if !has_shape(token, DASHED_SHAPE) {
                    return None;
                }
                NaiveDate::parse_from_str(token, "%Y-%m-%d").ok().and_then(midnight_utc)
            }
            DateLayout::Compact => {
                if !has_shape(token, COMPACT_SHAPE) {
                    return None;
                }
                let year = token[0..4].parse().ok()?;
                let month = token[4..6].parse().ok()?;
                let day = token[6..8].parse().ok()?;
                NaiveDate::from_ymd_opt(year, month, day).and_then(midnight_utc)
            }
        }
    }
}

// `D` stands for an ASCII digit, anything else must match literally.
const DASHED_SHAPE: &str = "DDDD-DD-DD";
const COMPACT_SHAPE: &str = "DDDDDDDD";
const TIMESTAMP_SHAPE: &str = "DDDD-DD-DDTDD:DD:DD";

fn has_shape(token: &str, shape: &str) -> bool {
    token.len() == shape.len()
        && token.bytes().zip(shape.bytes()).all(|(byte, expected)| match expected {
            b'D' => byte.is_ascii_digit(),
            _ => byte == expected,
        })
}

/// `DDDD-DD-DDTDD:DD:DD` then `Z`, or `.` + digits + `Z`.
fn is_fixed_width_timestamp(token: &str) -> bool {
    let Some(head) = token.get(..TIMESTAMP_SHAPE.len()) else {
        return false;
    };
    if !has_shape(head, TIMESTAMP_SHAPE) {
        return false;
    }

    match &token[TIMESTAMP_SHAPE.len()..] {
        "Z" => true,
        tail => tail
            .strip_prefix('.')
            .and_then(|rest| rest.strip_suffix('Z'))
            .is_some_and(|fraction| !fraction.is_empty() && fraction.bytes().all(|b| b.is_ascii_digit())),
    }
}

fn midnight_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

/// Parse a raw WHOIS creation date into a UTC instant.
///
/// Date-only layouts resolve to midnight UTC. The error carries the
/// original, untouched input.
pub fn normalize_creation_date(raw: &str) -> Result<DateTime<Utc>, CheckError> {
    let token = raw.split_whitespace().next().unwrap_or("");

    for layout in LAYOUTS {
        if let Some(parsed) = layout.parse(token) {
            debug!("Parsed creation date {:?} using {:?}", raw, layout);
            return Ok(parsed);
        }
    }

    Err(CheckError::UnsupportedDateFormat(raw.to_string()))
}

/// Render an instant as the canonical `YYYY-MM-DD` calendar date.
pub fn format_canonical(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}
