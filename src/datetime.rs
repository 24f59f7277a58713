//! Date/time formatting for console output and API payloads.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Default format for console output.
pub const CONSOLE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Format a UTC timestamp in the given timezone.
///
/// Falls back to UTC when the timezone name is unknown.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    match timezone.parse::<Tz>() {
        Ok(tz) => dt.with_timezone(&tz).format(format).to_string(),
        Err(_) => dt.format(format).to_string(),
    }
}

/// Convert a SQLite `datetime('now')` string (assumed UTC) to RFC3339.
///
/// Returns the input unchanged when it is not in SQLite format.
pub fn sqlite_to_rfc3339(datetime_str: &str) -> String {
    match NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S") {
        Ok(naive) => naive.and_utc().to_rfc3339(),
        Err(_) => datetime_str.to_string(),
    }
}

/// Format a timestamp the way SQLite's `datetime()` does.
pub fn to_sqlite(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_utc_datetime_moscow() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = format_utc_datetime(&dt, "Europe/Moscow", CONSOLE_FORMAT);
        assert_eq!(result, "15.01.2024 13:30");
    }

    #[test]
    fn test_format_utc_datetime_invalid_timezone() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = format_utc_datetime(&dt, "Invalid/Zone", "%Y/%m/%d %H:%M");
        assert_eq!(result, "2024/01/15 10:30");
    }

    #[test]
    fn test_sqlite_to_rfc3339() {
        assert_eq!(
            sqlite_to_rfc3339("2024-01-15 10:30:00"),
            "2024-01-15T10:30:00+00:00"
        );
        assert_eq!(sqlite_to_rfc3339("not a date"), "not a date");
    }

    #[test]
    fn test_to_sqlite() {
        let dt = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(to_sqlite(&dt), "2024-12-31 23:59:59");
    }
}
