//! Minutes/seconds projection of the remaining time

use std::fmt;

/// Remaining time split for display as `Xm YYs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingDisplay {
    minutes: i64,
    seconds: i64,
}

impl RemainingDisplay {
    /// Project a remaining duration; unknown or negative values have no display
    pub fn from_millis(remaining_millis: Option<i64>) -> Option<Self> {
        let millis = remaining_millis.filter(|ms| *ms >= 0)?;
        Some(Self {
            minutes: millis / 60_000,
            seconds: (millis / 1_000) % 60,
        })
    }

    /// Whole minutes remaining
    pub fn minutes(&self) -> i64 {
        self.minutes
    }

    /// Seconds past the whole minutes
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Minutes as shown (no padding)
    pub fn minutes_text(&self) -> String {
        self.minutes.to_string()
    }

    /// Seconds zero-padded to two digits
    pub fn seconds_text(&self) -> String {
        format!("{:02}", self.seconds)
    }
}

impl fmt::Display for RemainingDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m {:02}s", self.minutes, self.seconds)
    }
}

/// Display string for a remaining duration, blank when there is nothing to show
pub fn display_string(remaining_millis: Option<i64>) -> String {
    RemainingDisplay::from_millis(remaining_millis)
        .map(|d| d.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_and_padded_seconds() {
        let display = RemainingDisplay::from_millis(Some(125_000)).unwrap();
        assert_eq!(display.minutes_text(), "2");
        assert_eq!(display.seconds_text(), "05");
        assert_eq!(display.to_string(), "2m 05s");
    }

    #[test]
    fn test_partial_seconds_floor() {
        let display = RemainingDisplay::from_millis(Some(59_999)).unwrap();
        assert_eq!(display.minutes(), 0);
        assert_eq!(display.seconds(), 59);

        let display = RemainingDisplay::from_millis(Some(999)).unwrap();
        assert_eq!(display.to_string(), "0m 00s");
    }

    #[test]
    fn test_long_countdowns_keep_counting_minutes() {
        let display = RemainingDisplay::from_millis(Some(3 * 3_600_000 + 61_000)).unwrap();
        assert_eq!(display.minutes(), 181);
        assert_eq!(display.seconds(), 1);
    }

    #[test]
    fn test_blank_for_unknown_or_negative() {
        assert_eq!(RemainingDisplay::from_millis(None), None);
        assert_eq!(RemainingDisplay::from_millis(Some(-50)), None);
        assert_eq!(display_string(None), "");
        assert_eq!(display_string(Some(-50)), "");
        assert_eq!(display_string(Some(0)), "0m 00s");
    }
}
