use crate::domain::IdentifierList;
use crate::error::CoversheetError;
use crate::ports::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d";

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parses free-text student identifiers separated by commas or newlines.
/// Blank tokens are ignored; any other token must be a positive integer.
pub fn parse_identifier_list(input: &str) -> Result<IdentifierList> {
    let mut ids = Vec::new();
    for token in input.split(|c: char| c == ',' || c == '\n' || c == '\r') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let id = token.parse::<i64>().map_err(|_| {
            CoversheetError::Validation(format!("'{}' is not a valid student identifier", token))
        })?;
        ids.push(id);
    }
    IdentifierList::new(ids)
}

/// Normalizes a date or timestamp coming from the store to `YYYY-MM-DD`.
/// Supports RFC 3339, ISO 8601 without offset, SQL datetimes and plain dates;
/// anything else `dateparser` understands is accepted as UTC.
pub fn normalize_exam_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    // Keep the calendar date of the stored offset rather than shifting zones
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().format(DATE_OUTPUT_FORMAT).to_string();
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_OUTPUT_FORMAT) {
        return date.format(DATE_OUTPUT_FORMAT).to_string();
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(raw, format) {
            return naive_dt.date().format(DATE_OUTPUT_FORMAT).to_string();
        }
    }

    if let Ok(dt) = dateparser::parse_with_timezone(raw, &Utc) {
        return dt.date_naive().format(DATE_OUTPUT_FORMAT).to_string();
    }

    raw.to_string()
}

/// Scores print without decimals when whole, otherwise with at most two
/// decimals and no trailing zeros.
pub fn format_score(score: f64) -> String {
    if !score.is_finite() {
        return score.to_string();
    }
    if score.fract() == 0.0 {
        return format!("{:.0}", score);
    }
    let fixed = format!("{:.2}", score);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Class labels are text. A label that is a whole decimal such as `12.0`
/// loses the fraction; every other label is kept as written.
pub fn format_class_label(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains('.') {
        if let Ok(value) = raw.parse::<f64>() {
            if value.is_finite() && value.fract() == 0.0 {
                return format!("{:.0}", value);
            }
        }
    }
    raw.to_string()
}
