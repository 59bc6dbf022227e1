//! Due-date normalization and calendar arithmetic.
//!
//! Due dates are calendar days. They are stored as a UTC instant pinned to
//! [`DUE_HOUR_UTC`] so that rendering them in any client offset within
//! ±12h shows the same day that was entered.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::config::DUE_HOUR_UTC;

/// Parse a client-supplied due date into the calendar day it denotes.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 (the date in the string's own offset is
/// kept, not the UTC date) and naive `YYYY-MM-DDTHH:MM:SS[.fff]`.
pub fn parse_calendar_date(input: &str) -> Option<NaiveDate> {
  let input = input.trim();
  if input.is_empty() {
    return None;
  }

  if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
    return Some(date);
  }

  if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
    return Some(dt.date_naive());
  }

  NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
    .ok()
    .map(|dt| dt.date())
}

/// Pin a calendar day to the fixed due hour in UTC.
pub fn normalize_due_date(date: NaiveDate) -> DateTime<Utc> {
  let naive = date
    .and_hms_opt(DUE_HOUR_UTC, 0, 0)
    .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
  Utc.from_utc_datetime(&naive)
}

/// Parse and normalize in one step.
pub fn parse_due_date(input: &str) -> Option<DateTime<Utc>> {
  parse_calendar_date(input).map(normalize_due_date)
}

/// Add calendar months, clamping to the last day of shorter months
/// (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
  date.checked_add_months(Months::new(months))
}

/// Due dates for a monthly series starting at `base`, the base included.
///
/// Every occurrence is offset from the base rather than from its
/// predecessor, so a series starting on the 31st returns to the 31st in
/// long months instead of sticking at the 28th.
pub fn monthly_series(base: DateTime<Utc>, count: u32) -> Vec<DateTime<Utc>> {
  let base_date = base.date_naive();
  (0..count)
    .filter_map(|offset| add_months(base_date, offset))
    .map(normalize_due_date)
    .collect()
}

/// Half-open `[start, end)` UTC window covering a calendar month.
pub fn month_window(year: i32, month: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
  let start = NaiveDate::from_ymd_opt(year, month, 1)?;
  let end = add_months(start, 1)?;
  Some((start_of_day(start), start_of_day(end)))
}

/// Half-open `[start, end)` UTC window covering a calendar year.
pub fn year_window(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
  let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
  let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)?;
  Some((start_of_day(start), start_of_day(end)))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
  Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Storage format for timestamps. Fixed width with a `Z` suffix, so string
/// comparison in SQL orders the same as time.
pub fn to_db_string(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a timestamp written by [`to_db_string`] (or any RFC 3339 value).
pub fn from_db_string(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .ok()
}

/// `YYYY-MM` label of the month a date falls in.
pub fn month_label(dt: DateTime<Utc>) -> String {
  format!("{:04}-{:02}", dt.year(), dt.month())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Timelike;

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_parse_plain_date() {
    assert_eq!(parse_calendar_date("2024-03-15"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_calendar_date("  2024-03-15 "), Some(ymd(2024, 3, 15)));
  }

  #[test]
  fn test_parse_rfc3339_keeps_local_calendar_day() {
    // 23:30 at -05:00 is already the 16th in UTC, but the user meant the 15th
    assert_eq!(
      parse_calendar_date("2024-03-15T23:30:00-05:00"),
      Some(ymd(2024, 3, 15))
    );
    assert_eq!(
      parse_calendar_date("2024-03-15T00:00:00.000Z"),
      Some(ymd(2024, 3, 15))
    );
  }

  #[test]
  fn test_parse_naive_datetime() {
    assert_eq!(parse_calendar_date("2024-03-15T08:00:00"), Some(ymd(2024, 3, 15)));
  }

  #[test]
  fn test_parse_rejects_garbage() {
    assert_eq!(parse_calendar_date(""), None);
    assert_eq!(parse_calendar_date("mañana"), None);
    assert_eq!(parse_calendar_date("2024-02-30"), None);
  }

  #[test]
  fn test_normalize_pins_to_due_hour() {
    let dt = normalize_due_date(ymd(2024, 3, 15));
    assert_eq!(dt.date_naive(), ymd(2024, 3, 15));
    assert_eq!(dt.hour(), DUE_HOUR_UTC);
    assert_eq!(dt.minute(), 0);
    assert_eq!(to_db_string(dt), "2024-03-15T12:00:00Z");
  }

  #[test]
  fn test_add_months_clamps_to_month_end() {
    assert_eq!(add_months(ymd(2024, 1, 31), 1), Some(ymd(2024, 2, 29)));
    assert_eq!(add_months(ymd(2023, 1, 31), 1), Some(ymd(2023, 2, 28)));
    assert_eq!(add_months(ymd(2024, 11, 15), 2), Some(ymd(2025, 1, 15)));
  }

  #[test]
  fn test_monthly_series_offsets_from_base() {
    let base = normalize_due_date(ymd(2024, 1, 31));
    let series = monthly_series(base, 4);
    let days: Vec<NaiveDate> = series.iter().map(|d| d.date_naive()).collect();
    assert_eq!(
      days,
      vec![ymd(2024, 1, 31), ymd(2024, 2, 29), ymd(2024, 3, 31), ymd(2024, 4, 30)]
    );
    assert!(series.iter().all(|d| d.hour() == DUE_HOUR_UTC));
  }

  #[test]
  fn test_monthly_series_crosses_year() {
    let base = normalize_due_date(ymd(2024, 6, 10));
    let series = monthly_series(base, 12);
    assert_eq!(series.len(), 12);
    assert_eq!(series[11].date_naive(), ymd(2025, 5, 10));
  }

  #[test]
  fn test_month_window_bounds() {
    let (start, end) = month_window(2024, 12).unwrap();
    assert_eq!(to_db_string(start), "2024-12-01T00:00:00Z");
    assert_eq!(to_db_string(end), "2025-01-01T00:00:00Z");
    assert!(month_window(2024, 13).is_none());
    assert!(month_window(2024, 0).is_none());
  }

  #[test]
  fn test_year_window_bounds() {
    let (start, end) = year_window(2025).unwrap();
    assert_eq!(to_db_string(start), "2025-01-01T00:00:00Z");
    assert_eq!(to_db_string(end), "2026-01-01T00:00:00Z");
  }

  #[test]
  fn test_db_string_roundtrip_orders_lexicographically() {
    let a = normalize_due_date(ymd(2024, 9, 30));
    let b = normalize_due_date(ymd(2024, 10, 1));
    assert!(to_db_string(a) < to_db_string(b));
    assert_eq!(from_db_string(&to_db_string(a)), Some(a));
  }

  #[test]
  fn test_month_label() {
    assert_eq!(month_label(normalize_due_date(ymd(2024, 3, 5))), "2024-03");
  }
}
