//! Date parsing shared by the image and video extractors.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Years that fit the four-digit `YYYY` folder segment
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

/// Parse the date part of a capture timestamp.
///
/// Accepts EXIF style `2024:01:15 14:30:00`, ISO style `2024-01-15T14:30:00`
/// and bare dates. Only the first token is read, so time-of-day precision
/// and timezone suffixes do not matter.
pub fn parse_capture_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim().trim_matches('"').trim_end_matches('\0');
    let date_part = value.split(['T', ' ']).next()?;

    let mut parts = date_part.split([':', '-', '/']);
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;

    // Cameras with an unset clock write 0000:00:00
    if !YEAR_RANGE.contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Calendar date of a timestamp in the local timezone.
///
/// `None` when the timestamp lies outside years 1 to 9999. Some filesystems
/// store modification times far beyond that.
pub fn local_date(time: SystemTime) -> Option<NaiveDate> {
    let secs = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).ok()?,
        Err(before) => {
            let before = before.duration();
            let whole = i64::try_from(before.as_secs()).ok()?;
            // Round toward the past so 0.5s before the epoch is still 1969
            let partial = i64::from(before.subsec_nanos() > 0);
            whole.checked_add(partial)?.checked_neg()?
        }
    };
    let utc = DateTime::<Utc>::from_timestamp(secs, 0)?;
    if !YEAR_RANGE.contains(&utc.year()) {
        return None;
    }
    Some(utc.with_timezone(&Local).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn parses_exif_datetime() {
        assert_eq!(parse_capture_date("2021:05:04 10:11:12"), ymd(2021, 5, 4));
    }

    #[test]
    fn parses_date_without_time() {
        assert_eq!(parse_capture_date("2021:05:04"), ymd(2021, 5, 4));
    }

    #[test]
    fn parses_iso_and_quoted_values() {
        assert_eq!(parse_capture_date("2024-01-15T14:30:00Z"), ymd(2024, 1, 15));
        assert_eq!(parse_capture_date("\"2024-01-15 14:30:00\""), ymd(2024, 1, 15));
    }

    #[test]
    fn rejects_unset_clock_and_garbage() {
        assert_eq!(parse_capture_date("0000:00:00 00:00:00"), None);
        assert_eq!(parse_capture_date("    :  :     :  :  "), None);
        assert_eq!(parse_capture_date("yesterday"), None);
        assert_eq!(parse_capture_date("2021:13:40"), None);
        assert_eq!(parse_capture_date(""), None);
    }

    #[test]
    fn rejects_years_wider_than_four_digits() {
        assert_eq!(parse_capture_date("12021:05:04 10:11:12"), None);
        assert_eq!(parse_capture_date("-2021:05:04"), None);
        assert_eq!(parse_capture_date("9999:12:31"), ymd(9999, 12, 31));
    }

    #[test]
    fn local_date_round_trips_local_noon() {
        use chrono::TimeZone;
        let noon: SystemTime = Local.with_ymd_and_hms(2022, 1, 2, 12, 0, 0).unwrap().into();
        assert_eq!(local_date(noon), ymd(2022, 1, 2));
    }

    #[test]
    fn local_date_is_none_far_outside_calendar_range() {
        use std::time::Duration;
        let far_future = UNIX_EPOCH + Duration::from_secs(20_000_000_000_000);
        assert_eq!(local_date(far_future), None);

        // Representable by chrono but past year 9999
        let year_twelve_thousand = UNIX_EPOCH + Duration::from_secs(316_000_000_000);
        assert_eq!(local_date(year_twelve_thousand), None);
    }

    #[test]
    fn local_date_handles_times_before_the_epoch() {
        use std::time::Duration;
        let date = local_date(UNIX_EPOCH - Duration::from_millis(86_400_500)).unwrap();
        assert_eq!(date.year(), 1969);
    }
}
