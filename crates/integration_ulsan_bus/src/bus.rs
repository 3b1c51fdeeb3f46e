//! Per-bus sensor
//!
//! Presents a single route of a stop as an arrival countdown. Bus sensors
//! never fetch: they read the snapshot their station's fetcher last stored.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::trace;

use crate::api::BusArrivalApi;
use crate::config::StationConfig;
use crate::error::BusError;
use crate::format::format_arrival;
use crate::models::{ArrivalRecord, SYNC_DATE_FORMAT};
use crate::sensor::{
    Attributes, ICON_BUS, ICON_BUS_ALERT, ICON_BUS_READY, STATE_NONE, Sensor,
};
use crate::station::station_label;
use crate::throttle::{BUS_REFRESH_INTERVAL_SECS, Throttle};
use crate::window::UpdateSchedule;

/// Sensor for one route at one stop
#[derive(Debug)]
pub struct BusSensor {
    station_id: String,
    station_label: String,
    schedule: UpdateSchedule,
    bus_id: String,
    bus_name: Option<String>,
    route_name: String,
    api: Arc<BusArrivalApi>,
    throttle: Throttle,
    window_active: Option<bool>,
    sync_date: Option<NaiveDateTime>,
    record: Option<ArrivalRecord>,
}

impl BusSensor {
    /// Create a bus sensor for `bus_id` at the given station
    ///
    /// The sensor follows the station's active windows and picks up an
    /// explicit name from the station's per-route overrides.
    #[must_use]
    pub fn new(
        station: &StationConfig,
        bus_id: impl Into<String>,
        api: Arc<BusArrivalApi>,
    ) -> Self {
        let bus_id = bus_id.into();
        let bus_name = station
            .bus(&bus_id)
            .and_then(|b| b.name.clone())
            .filter(|n| !n.trim().is_empty());

        Self {
            station_id: station.station_id.clone(),
            station_label: station_label(station),
            schedule: station.schedule(),
            route_name: bus_id.clone(),
            bus_id,
            bus_name,
            api,
            throttle: Throttle::from_secs(BUS_REFRESH_INTERVAL_SECS),
            window_active: None,
            sync_date: None,
            record: None,
        }
    }

    /// Seed the sensor with the record it was discovered from
    #[must_use]
    pub fn with_record(mut self, record: ArrivalRecord) -> Self {
        if !record.route_name.is_empty() {
            self.route_name.clone_from(&record.route_name);
        }
        self.record = Some(record);
        self
    }

    /// Route id this sensor follows
    #[must_use]
    pub fn bus_id(&self) -> &str {
        &self.bus_id
    }

    /// The record seen at the last active refresh
    #[must_use]
    pub const fn record(&self) -> Option<&ArrivalRecord> {
        self.record.as_ref()
    }

    /// Whether the last refresh happened outside every active window
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.window_active == Some(false)
    }
}

#[async_trait]
impl Sensor for BusSensor {
    async fn refresh(&mut self, now: NaiveDateTime) -> Result<(), BusError> {
        if !self.throttle.try_acquire(now) {
            trace!(bus_id = %self.bus_id, "Bus refresh throttled");
            return Ok(());
        }

        let active = self.schedule.is_active(now);
        self.window_active = Some(active);
        self.sync_date = Some(now);

        if active {
            self.record = self.api.snapshot().arrival(&self.bus_id).cloned();
            if let Some(record) = self.record.as_ref().filter(|r| !r.route_name.is_empty()) {
                self.route_name.clone_from(&record.route_name);
            }
        }

        Ok(())
    }

    fn entity_id(&self) -> String {
        format!("sensor.ulsan_bus_{}_{}", self.station_id, self.bus_id)
    }

    fn name(&self) -> String {
        self.bus_name
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.station_label, self.route_name))
    }

    fn state(&self) -> String {
        if self.is_suspended() {
            return STATE_NONE.to_string();
        }
        match &self.record {
            None => STATE_NONE.to_string(),
            Some(record) if record.is_arriving() => "0".to_string(),
            Some(record) => format_arrival(&record.arrival_seconds),
        }
    }

    fn icon(&self) -> &'static str {
        if self.is_suspended() {
            ICON_BUS_READY
        } else if self.record.is_none() {
            ICON_BUS_ALERT
        } else {
            ICON_BUS
        }
    }

    fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();

        if let Some(record) = &self.record {
            attrs.insert("노선ID", record.route_id.clone());
            attrs.insert("버스번호", record.route_name.clone());
            attrs.insert("도착예정시간", record.arrival_seconds.clone());
            attrs.insert(
                "동기화시간",
                record.sync_date.format(SYNC_DATE_FORMAT).to_string(),
            );
        }

        attrs.insert(
            "Sync Date",
            self.sync_date
                .map_or(Value::Null, |d| d.format(SYNC_DATE_FORMAT).to_string().into()),
        );
        attrs.insert("is Update", self.window_active.map_or(Value::Null, Value::from));
        attrs.insert(
            "update windows",
            if self.schedule.is_empty() {
                Value::Null
            } else {
                Value::from(self.schedule.labels())
            },
        );

        attrs
    }
}
