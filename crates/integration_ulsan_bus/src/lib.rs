//! Ulsan bus arrival integration
//!
//! Polls the [Ulsan BIS](http://openapi.its.ulsan.kr) `getBusArrivalInfo`
//! endpoint for a set of bus stops and exposes the result as dashboard
//! sensors: one per stop and one per route serving that stop.
//!
//! # Architecture
//!
//! - [`BusArrivalClient`] is the transport seam, implemented by [`UlsanBusClient`].
//! - [`BusArrivalApi`] is the per-stop fetcher. It owns the arrival map and
//!   error state and replaces them wholesale on every request.
//! - [`StationSensor`] gates polling on the stop's active [`TimeWindow`]s and
//!   drives the fetcher.
//! - [`BusSensor`] reads one route out of the fetcher's snapshot and formats
//!   the countdown.
//!
//! Every sensor keeps its own [`Throttle`] and is refreshed with an explicit
//! local time, so the caller owns the clock.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use integration_ulsan_bus::{
//!     BusArrivalApi, Sensor, StationSensor, UlsanBusClient, UlsanBusConfig,
//! };
//!
//! let config = UlsanBusConfig::for_testing();
//! let client = Arc::new(UlsanBusClient::new(&config)?);
//! let station = config.stations[0].clone();
//! let api = Arc::new(BusArrivalApi::new(client, station.station_id.clone(), station.schedule()));
//!
//! let mut sensor = StationSensor::new(station, api);
//! sensor.refresh(chrono::Local::now().naive_local()).await?;
//! let buses = sensor.discover_buses();
//! ```

mod api;
mod bus;
mod client;
mod config;
mod error;
mod format;
mod models;
mod sensor;
mod station;
mod throttle;
mod window;

pub use api::{BusArrivalApi, DEFAULT_END_HOUR, DEFAULT_START_HOUR};
pub use bus::BusSensor;
pub use client::{BusArrivalClient, UlsanBusClient};
pub use config::{BusConfig, StationConfig, UlsanBusConfig};
pub use error::BusError;
pub use format::{format_arrival, format_seconds};
pub use models::{ApiFault, ApiSnapshot, ArrivalFeed, ArrivalRecord, ArrivalRow, SYNC_DATE_FORMAT};
pub use sensor::{
    Attributes, ICON_BUS, ICON_BUS_ALERT, ICON_BUS_READY, ICON_EYE_OFF, ICON_SIGN_CAUTION,
    ICON_STATION, STATE_ERROR, STATE_NONE, Sensor, SensorState,
};
pub use station::StationSensor;
pub use throttle::{BUS_REFRESH_INTERVAL_SECS, STATION_REFRESH_INTERVAL_SECS, Throttle};
pub use window::{TimeWindow, UpdateSchedule};
