use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::fmt;

/// Earliest and latest years the store can keep. RFC 3339 only has
/// four-digit years, and stored dates must sort as text.
pub const MIN_YEAR: i32 = 0;
pub const MAX_YEAR: i32 = 9999;

/// True when `date` falls within 0000-01-01..=9999-12-31 (UTC).
pub fn is_storable_date(date: DateTime<Utc>) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&date.year())
}

/// Parse `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, ParseDateError> {
    let input = input.trim();
    let date = match DateTime::parse_from_rfc3339(input) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map_err(ParseDateError::InvalidFormat)?
            .and_time(chrono::NaiveTime::MIN)
            .and_utc(),
    };

    if !is_storable_date(date) {
        return Err(ParseDateError::OutOfRange);
    }
    Ok(date)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseDateError {
    InvalidFormat(chrono::ParseError),
    OutOfRange,
}

impl fmt::Display for ParseDateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseDateError::InvalidFormat(err) => write!(f, "{}", err),
            ParseDateError::OutOfRange => {
                write!(f, "year must be between {:04} and {}", MIN_YEAR, MAX_YEAR)
            }
        }
    }
}

impl std::error::Error for ParseDateError {}
