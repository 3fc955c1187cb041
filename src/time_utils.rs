// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Civil-time helpers: the fixed UTC+9 zone and user time-token parsing.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, SecondsFormat, Utc,
};

use crate::error::{AppError, Result};

/// Offset of the civil timezone from UTC. No daylight saving applies.
pub const CIVIL_UTC_OFFSET_SECS: i32 = 9 * 60 * 60;

/// The fixed civil timezone (UTC+9).
pub fn civil_offset() -> FixedOffset {
    FixedOffset::east_opt(CIVIL_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Current instant in the civil timezone.
pub fn now_civil() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&civil_offset())
}

/// Today's calendar date in the civil timezone.
pub fn civil_today() -> NaiveDate {
    now_civil().date_naive()
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Combine a calendar date and a wall-clock time in the civil timezone.
pub fn at_civil(date: NaiveDate, time: NaiveTime) -> Result<DateTime<FixedOffset>> {
    date.and_time(time)
        .and_local_timezone(civil_offset())
        .single()
        .ok_or_else(|| AppError::Parse(format!("{} {}", date, time)))
}

/// Parse a wall-clock token in `HH:MM` or 4-digit `HHMM` form. Seconds are zero.
pub fn parse_clock_time(token: &str) -> Option<NaiveTime> {
    let token = token.trim();
    if token.contains(':') {
        return NaiveTime::parse_from_str(token, "%H:%M").ok();
    }
    if token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveTime::parse_from_str(token, "%H%M").ok();
    }
    None
}

/// Interpret a time token belonging to `date`.
///
/// An RFC 3339 timestamp is taken as-is; otherwise `HH:MM` then `HHMM` are
/// tried and placed on `date` in the civil timezone.
pub fn parse_record_time(token: &str, date: NaiveDate) -> Result<DateTime<FixedOffset>> {
    let token = token.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(token) {
        return Ok(instant);
    }
    match parse_clock_time(token) {
        Some(time) => at_civil(date, time),
        None => Err(AppError::Parse(token.to_string())),
    }
}

/// Normalize a user-supplied time token to an instant.
///
/// `now` yields the supplied current instant (moved into the civil
/// timezone); anything else goes through [`parse_record_time`] with
/// `reference_date` as the day.
pub fn normalize(
    token: &str,
    reference_date: NaiveDate,
    now: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>> {
    if token.trim().eq_ignore_ascii_case("now") {
        return Ok(now.with_timezone(&civil_offset()));
    }
    parse_record_time(token, reference_date)
}

/// Format an instant as RFC 3339 with whole seconds, keeping its offset.
pub fn format_rfc3339(date: DateTime<FixedOffset>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn fixed_now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-01-10T01:02:03Z").unwrap()
    }

    #[test]
    fn test_compact_and_colon_forms_agree() {
        let compact = normalize("0930", day(), fixed_now()).unwrap();
        let colon = normalize("09:30", day(), fixed_now()).unwrap();
        assert_eq!(compact, colon);
        assert_eq!(format_rfc3339(compact), "2024-01-10T09:30:00+09:00");
    }

    #[test]
    fn test_now_is_moved_into_civil_zone() {
        let now = normalize("now", day(), fixed_now()).unwrap();
        assert_eq!(now, fixed_now());
        assert_eq!(now.offset().local_minus_utc(), CIVIL_UTC_OFFSET_SECS);
        assert_eq!(now.hour(), 10);
    }

    #[test]
    fn test_rfc3339_kept_as_is() {
        let t = normalize("2024-01-09T23:15:00Z", day(), fixed_now()).unwrap();
        assert_eq!(format_rfc3339(t), "2024-01-09T23:15:00Z");
    }

    #[test]
    fn test_rejects_garbage() {
        for bad in ["", "930", "09300", "25:00", "12:61", "noon", "2024-01-10"] {
            assert!(
                matches!(normalize(bad, day(), fixed_now()), Err(AppError::Parse(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_midnight_compact() {
        let t = parse_record_time("0000", day()).unwrap();
        assert_eq!(format_rfc3339(t), "2024-01-10T00:00:00+09:00");
    }

    #[test]
    fn test_month_start() {
        assert_eq!(
            month_start(day()),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }
}
