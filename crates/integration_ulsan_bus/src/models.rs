//! Bus arrival data models
//!
//! Typed representations of the arrival rows returned by the Ulsan BIS
//! `getBusArrivalInfo` endpoint and of the state a fetcher keeps between
//! polling cycles.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format used for sync dates in sensor attributes
pub const SYNC_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One arrival row as reported by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArrivalRow {
    /// Key of the row within a station's result map
    pub key: String,
    /// Route id (`ROUTEID`)
    pub route_id: String,
    /// Route display name, i.e. the bus number (`ROUTENM`)
    pub route_name: String,
    /// Seconds until arrival, verbatim (`ARRIVALTIME`)
    pub arrival_seconds: String,
}

/// Outcome of a single request that reached the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrivalFeed {
    /// `resultCode` was `0`
    Arrivals(Vec<ArrivalRow>),
    /// The API answered with a non-zero `resultCode`
    Rejected {
        /// The reported result code
        code: String,
        /// The reported message
        message: String,
    },
}

/// An arrival as exposed to sensors
///
/// Records are rebuilt on every successful fetch and never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArrivalRecord {
    /// Route display name (bus number)
    pub route_name: String,
    /// Route id
    pub route_id: String,
    /// Seconds until arrival, verbatim from the API
    pub arrival_seconds: String,
    /// Local time of the fetch that produced this record
    pub sync_date: NaiveDateTime,
    /// Whether the fetcher considered polling allowed at `sync_date`
    pub update_allowed: bool,
}

impl ArrivalRecord {
    /// Build a record from a wire row
    #[must_use]
    pub fn from_row(row: ArrivalRow, sync_date: NaiveDateTime, update_allowed: bool) -> Self {
        Self {
            route_name: row.route_name,
            route_id: row.route_id,
            arrival_seconds: row.arrival_seconds,
            sync_date,
            update_allowed,
        }
    }

    /// Arrival countdown in seconds, if the API value is numeric
    #[must_use]
    pub fn arrival_secs(&self) -> Option<u64> {
        self.arrival_seconds.trim().parse().ok()
    }

    /// Whether the bus is reported as arriving now
    #[must_use]
    pub fn is_arriving(&self) -> bool {
        self.arrival_seconds.trim() == "0"
    }
}

/// API-level failure captured from a non-zero `resultCode`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiFault {
    /// Result code reported by the API
    pub code: String,
    /// Message reported by the API
    pub message: String,
}

/// Everything a fetcher knows after its last completed request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiSnapshot {
    /// Arrivals keyed by route id
    pub arrivals: BTreeMap<String, ArrivalRecord>,
    /// Set when the last request was rejected by the API
    pub error: Option<ApiFault>,
    /// Local time of the last completed request
    pub sync_date: Option<NaiveDateTime>,
    /// Whether polling was allowed at the last request
    pub update_allowed: bool,
}

impl ApiSnapshot {
    /// Initial state before any request completed
    #[must_use]
    pub fn initial() -> Self {
        Self {
            update_allowed: true,
            ..Self::default()
        }
    }

    /// Whether the last request was rejected by the API
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Look up the record for a route
    #[must_use]
    pub fn arrival(&self, route_id: &str) -> Option<&ArrivalRecord> {
        self.arrivals.get(route_id)
    }
}
