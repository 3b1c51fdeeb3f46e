//! Per-instance minimum-interval gate

use chrono::{Duration, NaiveDateTime};

/// Minimum interval between two refreshes of a station sensor
pub const STATION_REFRESH_INTERVAL_SECS: i64 = 90;

/// Minimum interval between two refreshes of a bus sensor
pub const BUS_REFRESH_INTERVAL_SECS: i64 = 10;

/// Gate that lets a refresh through at most once per `min_interval`
///
/// The last accepted timestamp lives on the instance and is compared against
/// the caller-supplied `now`, so two sensors never share throttling state.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_run: Option<NaiveDateTime>,
}

impl Throttle {
    /// Create a throttle with the given minimum interval
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_run: None,
        }
    }

    /// Create a throttle from a number of seconds
    #[must_use]
    pub fn from_secs(secs: i64) -> Self {
        Self::new(Duration::seconds(secs))
    }

    /// Returns true (and records `now`) if a refresh may run at `now`
    ///
    /// A clock that moved backwards past the last run opens the gate.
    pub fn try_acquire(&mut self, now: NaiveDateTime) -> bool {
        let ready = self.last_run.is_none_or(|last| {
            let elapsed = now - last;
            elapsed < Duration::zero() || elapsed >= self.min_interval
        });

        if ready {
            self.last_run = Some(now);
        }
        ready
    }

    /// Timestamp of the last accepted refresh
    #[must_use]
    pub const fn last_run(&self) -> Option<NaiveDateTime> {
        self.last_run
    }
}
