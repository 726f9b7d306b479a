//! Cell-level coercion helpers shared by the normalizer, filters and exporter.
//!
//! Every function here is lenient: a value that cannot be coerced is reported
//! as absent (`None`) rather than as an error, so callers can apply their own
//! default-fill policy.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Tokens treated as a missing cell, compared case-insensitively after trimming.
const NULL_TOKENS: &[&str] = &["na", "n/a", "nan", "null", "none", "<na>", "#n/a", "-nan"];

// Slash dates are month-first; day-first only catches values such as 13/01/2024.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lowered = trimmed.to_ascii_lowercase();
    NULL_TOKENS.contains(&lowered.as_str())
}

/// Returns the trimmed cell text, or `None` when the cell counts as missing.
pub fn present(value: &str) -> Option<&str> {
    if is_missing(value) {
        None
    } else {
        Some(value.trim())
    }
}

/// Parses a finite number. Text such as `"bad"`, `"inf"` or `"NaN"` yields `None`.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = present(value)?;
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_utc());
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Parses a date or datetime cell. Plain dates land on midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = present(value)?;
    parse_naive_datetime(trimmed)
        .or_else(|_| parse_naive_date(trimmed).map(|d| d.and_time(NaiveTime::MIN)))
        .ok()
}

/// Renders a timestamp so that [`parse_timestamp`] reads it back unchanged.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else if value.nanosecond() == 0 {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S%.f").to_string()
    }
}

/// Display formatting for report cells.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tokens_are_case_insensitive() {
        assert!(is_missing(""));
        assert!(is_missing("   "));
        assert!(is_missing("NaN"));
        assert!(is_missing(" None "));
        assert!(is_missing("#N/A"));
        assert!(is_missing("-NaN"));
        assert!(!is_missing("Dubai"));
        assert!(!is_missing("0"));
    }

    #[test]
    fn parse_number_rejects_text_and_non_finite_values() {
        assert_eq!(parse_number(" 42.5 "), Some(42.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number("bad"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn parse_timestamp_accepts_dates_and_datetimes() {
        let midnight = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(parse_timestamp("2024-01-15"), Some(midnight));
        assert_eq!(parse_timestamp("15/01/2024"), Some(midnight));

        let afternoon = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-15T14:30:00"), Some(afternoon));
        assert_eq!(parse_timestamp("2024-01-15 14:30"), Some(afternoon));
        assert_eq!(parse_timestamp("2024-01-15T14:30:00Z"), Some(afternoon));
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn slash_dates_read_month_first_with_day_first_fallback() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(
            parse_timestamp("01/02/2024"),
            Some(date(2024, 1, 2).and_time(NaiveTime::MIN))
        );
        assert_eq!(
            parse_timestamp("13/01/2024"),
            Some(date(2024, 1, 13).and_time(NaiveTime::MIN))
        );
        assert_eq!(
            parse_timestamp("03/04/2024 09:15:00"),
            date(2024, 3, 4).and_hms_opt(9, 15, 0)
        );
        assert_eq!(
            parse_timestamp("25/12/2024 18:00"),
            date(2024, 12, 25).and_hms_opt(18, 0, 0)
        );
        assert_eq!(parse_naive_date("02/03/2024").unwrap(), date(2024, 2, 3));
    }

    #[test]
    fn format_timestamp_round_trips() {
        for raw in ["2024-02-29", "2024-02-29 08:15:00", "2024-02-29 08:15:00.250"] {
            let parsed = parse_timestamp(raw).unwrap();
            assert_eq!(format_timestamp(&parsed), raw);
            assert_eq!(parse_timestamp(&format_timestamp(&parsed)), Some(parsed));
        }
    }

    #[test]
    fn format_number_trims_whole_values() {
        assert_eq!(format_number(150.0), "150");
        assert_eq!(format_number(12.346), "12.35");
    }
}
