//! Polling driver
//!
//! Plays the role of the dashboard host: builds one station sensor per
//! configured stop, registers a bus sensor for every route that shows up on a
//! stop's arrival board, and refreshes everything on each tick.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDateTime;
use integration_ulsan_bus::{
    BusArrivalApi, BusArrivalClient, BusError, BusSensor, Sensor, SensorState, StationSensor,
    UlsanBusClient, UlsanBusConfig,
};
use tracing::{info, warn};

/// All sensors of one configuration
#[derive(Debug)]
pub struct Dashboard {
    stations: Vec<StationSensor>,
    buses: Vec<BusSensor>,
    registered: HashSet<String>,
}

impl Dashboard {
    /// Build sensors for every configured station, sharing one HTTP client
    pub fn from_config(config: &UlsanBusConfig) -> Result<Self, BusError> {
        let client: Arc<dyn BusArrivalClient> = Arc::new(UlsanBusClient::new(config)?);
        Ok(Self::with_client(config, &client))
    }

    /// Build sensors on top of an existing client
    pub fn with_client(config: &UlsanBusConfig, client: &Arc<dyn BusArrivalClient>) -> Self {
        let stations = config
            .stations
            .iter()
            .map(|station| {
                let api = Arc::new(BusArrivalApi::new(
                    Arc::clone(client),
                    station.station_id.clone(),
                    station.schedule(),
                ));
                StationSensor::new(station.clone(), api)
            })
            .collect();

        Self {
            stations,
            buses: Vec::new(),
            registered: HashSet::new(),
        }
    }

    /// Number of registered bus sensors
    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    /// Refresh every sensor at `now` and return their states
    ///
    /// A station whose request fails is logged and skipped; its previous
    /// data stays in place until a later tick succeeds.
    pub async fn tick(&mut self, now: NaiveDateTime) -> Vec<SensorState> {
        for station in &mut self.stations {
            if let Err(e) = station.refresh(now).await {
                warn!(
                    station = %station.entity_id(),
                    error = %e,
                    retryable = e.is_retryable(),
                    "Station refresh failed"
                );
            }

            for bus in station.discover_buses() {
                let entity_id = bus.entity_id();
                if self.registered.insert(entity_id.clone()) {
                    info!(%entity_id, name = %bus.name(), "Registered bus sensor");
                    self.buses.push(bus);
                }
            }
        }

        for bus in &mut self.buses {
            if let Err(e) = bus.refresh(now).await {
                warn!(bus = %bus.entity_id(), error = %e, "Bus refresh failed");
            }
        }

        self.states()
    }

    /// Current states of all sensors, stations first
    pub fn states(&self) -> Vec<SensorState> {
        self.stations
            .iter()
            .map(Sensor::state_snapshot)
            .chain(self.buses.iter().map(Sensor::state_snapshot))
            .collect()
    }
}

/// Query the first configured stop to confirm the service key is accepted
pub async fn check_service(config: &UlsanBusConfig) -> Result<bool, BusError> {
    let client = UlsanBusClient::new(config)?;
    Ok(client.is_healthy().await)
}
