//! Active time windows
//!
//! A station (and every bus sensor attached to it) is only polled and
//! displayed during its configured `HH:MM` wall-clock windows. Evaluation is
//! done at minute precision against an injected local time so that callers
//! (and tests) decide what "now" means.

use std::fmt;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::BusError;

/// A single `start_time`..=`end_time` interval, both given as `HH:MM`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window, e.g. `"09:00"`
    #[serde(default)]
    pub start_time: String,
    /// End of the window (inclusive), e.g. `"18:00"`
    #[serde(default)]
    pub end_time: String,
}

impl TimeWindow {
    /// Create a window from two `HH:MM` strings
    #[must_use]
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Parse both bounds
    ///
    /// # Errors
    ///
    /// Returns [`BusError::InvalidTimeWindow`] if either bound is not a valid `HH:MM` time.
    pub fn parse(&self) -> Result<(NaiveTime, NaiveTime), BusError> {
        Ok((
            parse_hh_mm(&self.start_time)?,
            parse_hh_mm(&self.end_time)?,
        ))
    }

    /// Whether `now` falls inside the window, compared at minute precision
    ///
    /// A malformed window never matches; the parse failure is logged.
    #[must_use]
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        let (start, end) = match self.parse() {
            Ok(bounds) => bounds,
            Err(e) => {
                error!(window = %self, error = %e, "Failed to evaluate time window");
                return false;
            },
        };

        let Some(now) = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0) else {
            return false;
        };

        start <= now && now <= end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.start_time, self.end_time)
    }
}

/// Parse a `HH:MM` (or `H:MM`) string into a time of day
fn parse_hh_mm(value: &str) -> Result<NaiveTime, BusError> {
    let invalid = || BusError::InvalidTimeWindow(value.to_string());

    let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.trim().parse().map_err(|_| invalid())?;
    let minute: u32 = minute.trim().parse().map_err(|_| invalid())?;

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// The set of windows configured for a station
///
/// An empty schedule is always active. Otherwise the schedule is active when
/// any one of its windows contains the current time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateSchedule {
    windows: Vec<TimeWindow>,
}

impl UpdateSchedule {
    /// Create a schedule from a list of windows
    #[must_use]
    pub const fn new(windows: Vec<TimeWindow>) -> Self {
        Self { windows }
    }

    /// Whether no window is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// The configured windows
    #[must_use]
    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    /// Whether polling and display are enabled at `now`
    #[must_use]
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.windows.is_empty() || self.windows.iter().any(|w| w.contains(now))
    }

    /// Windows rendered as `start~end` labels for sensor attributes
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.windows.iter().map(ToString::to_string).collect()
    }
}

impl From<Vec<TimeWindow>> for UpdateSchedule {
    fn from(windows: Vec<TimeWindow>) -> Self {
        Self::new(windows)
    }
}


#[cfg(test)]
mod proptest_tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn contains_matches_minute_comparison(
            start in 0u32..1440,
            len in 0u32..1440,
            now in 0u32..1440,
            second in 0u32..60,
        ) {
            let end = (start + len).min(1439);
            let window = TimeWindow::new(
                format!("{:02}:{:02}", start / 60, start % 60),
                format!("{:02}:{:02}", end / 60, end % 60),
            );
            let now_dt = NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(now / 60, now % 60, second)
                .unwrap();

            prop_assert_eq!(window.contains(now_dt), start <= now && now <= end);
        }

        #[test]
        fn garbage_windows_never_match(start in "[a-z ]{0,6}", now in 0u32..1440) {
            let window = TimeWindow::new(start, "12:00");
            let now_dt = NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(now / 60, now % 60, 0)
                .unwrap();

            prop_assert!(!window.contains(now_dt));
        }
    }
}
