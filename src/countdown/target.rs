//! Parsing user input into a target instant

use anyhow::{bail, Context};
use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone};

use crate::clock::EpochMillis;

/// Parse a target as local time
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, or a time of day (`HH:MM:SS` / `HH:MM`)
/// which is taken on the same calendar day as `now`.
pub fn parse_target(input: &str, now: DateTime<Local>) -> anyhow::Result<DateTime<Local>> {
    let input = input.trim();

    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Local
            .from_local_datetime(&dt)
            .single()
            .context("Ambiguous or skipped local datetime");
    }

    for format in ["%H:%M:%S", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(input, format) {
            let dt = now.date_naive().and_time(time);
            return Local
                .from_local_datetime(&dt)
                .single()
                .context("Ambiguous or skipped local time");
        }
    }

    bail!(
        "Invalid target '{}'. Use HH:MM, HH:MM:SS or YYYY-MM-DD HH:MM:SS",
        input
    )
}

/// Parse a target and convert it to epoch milliseconds
pub fn parse_target_millis(input: &str, now: DateTime<Local>) -> anyhow::Result<EpochMillis> {
    parse_target(input, now).map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_full_datetime() {
        let target = parse_target("2025-06-16 08:30:05", noon()).unwrap();
        assert_eq!(target.day(), 16);
        assert_eq!(target.hour(), 8);
        assert_eq!(target.second(), 5);
    }

    #[test]
    fn test_time_of_day_uses_today() {
        let target = parse_target("12:00:30", noon()).unwrap();
        assert_eq!(target.day(), 15);
        assert_eq!((target - noon()).num_milliseconds(), 30_000);

        let target = parse_target(" 13:15 ", noon()).unwrap();
        assert_eq!(target.hour(), 13);
        assert_eq!(target.minute(), 15);
        assert_eq!(target.second(), 0);
    }

    #[test]
    fn test_millis() {
        let millis = parse_target_millis("12:00:01", noon()).unwrap();
        assert_eq!(millis - noon().timestamp_millis(), 1_000);
    }

    #[test]
    fn test_invalid() {
        assert!(parse_target("tomorrow", noon()).is_err());
        assert!(parse_target("25:00", noon()).is_err());
        assert!(parse_target("", noon()).is_err());
    }
}
