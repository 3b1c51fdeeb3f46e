//! Per-station arrival fetcher
//!
//! [`BusArrivalApi`] owns the arrival map and error state of one stop. Each
//! completed request swaps in a brand-new [`ApiSnapshot`]; readers holding an
//! older snapshot keep a consistent (if stale) view.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{NaiveDateTime, Timelike};
use tracing::{debug, error, instrument, warn};

use crate::client::BusArrivalClient;
use crate::error::BusError;
use crate::models::{ApiFault, ApiSnapshot, ArrivalFeed, ArrivalRecord};
use crate::window::UpdateSchedule;

/// First hour of the day during which polling is allowed by default
pub const DEFAULT_START_HOUR: u32 = 5;

/// Hour at which default polling stops (exclusive)
pub const DEFAULT_END_HOUR: u32 = 24;

/// Fetcher for a single stop
pub struct BusArrivalApi {
    client: Arc<dyn BusArrivalClient>,
    station_id: String,
    schedule: UpdateSchedule,
    snapshot: ArcSwap<ApiSnapshot>,
}

impl std::fmt::Debug for BusArrivalApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusArrivalApi")
            .field("station_id", &self.station_id)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

impl BusArrivalApi {
    /// Create a fetcher for `station_id`
    #[must_use]
    pub fn new(
        client: Arc<dyn BusArrivalClient>,
        station_id: impl Into<String>,
        schedule: UpdateSchedule,
    ) -> Self {
        Self {
            client,
            station_id: station_id.into(),
            schedule,
            snapshot: ArcSwap::from_pointee(ApiSnapshot::initial()),
        }
    }

    /// The stop this fetcher polls
    #[must_use]
    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    /// The current state
    #[must_use]
    pub fn snapshot(&self) -> Arc<ApiSnapshot> {
        self.snapshot.load_full()
    }

    /// Whether polling is allowed at `now`
    ///
    /// Defaults to the `[05:00, 24:00)` service day; a configured schedule
    /// takes precedence.
    #[must_use]
    pub fn update_allowed(&self, now: NaiveDateTime) -> bool {
        if self.schedule.is_empty() {
            (DEFAULT_START_HOUR..DEFAULT_END_HOUR).contains(&now.hour())
        } else {
            self.schedule.is_active(now)
        }
    }

    /// Fetch the arrival board and replace the current snapshot
    ///
    /// # Errors
    ///
    /// Transport and parse errors are logged and returned; the previous
    /// snapshot is kept. A rejection by the API is not an error: it replaces
    /// the snapshot with an empty map and the reported fault.
    #[instrument(skip(self, now), fields(station_id = %self.station_id))]
    pub async fn refresh(&self, now: NaiveDateTime) -> Result<(), BusError> {
        let update_allowed = self.update_allowed(now);

        let feed = match self.client.fetch_arrivals(&self.station_id).await {
            Ok(feed) => feed,
            Err(e) => {
                error!(error = %e, "Failed to update bus arrival status");
                return Err(e);
            },
        };

        let next = match feed {
            ArrivalFeed::Rejected { code, message } => {
                error!(%code, %message, "Bus arrival API reported an error");
                ApiSnapshot {
                    arrivals: Default::default(),
                    error: Some(ApiFault { code, message }),
                    sync_date: Some(now),
                    update_allowed,
                }
            },
            ArrivalFeed::Arrivals(rows) => {
                let mut arrivals = BTreeMap::new();
                for row in rows {
                    let key = row.key.clone();
                    let record = ArrivalRecord::from_row(row, now, update_allowed);
                    if let Some(previous) = arrivals.insert(key, record) {
                        warn!(
                            route_id = %previous.route_id,
                            route_name = %previous.route_name,
                            "Duplicate route on arrival board, keeping the later row"
                        );
                    }
                }
                ApiSnapshot {
                    arrivals,
                    error: None,
                    sync_date: Some(now),
                    update_allowed,
                }
            },
        };

        debug!(count = next.arrivals.len(), update_allowed, "Arrival snapshot replaced");
        self.snapshot.store(Arc::new(next));
        Ok(())
    }
}
