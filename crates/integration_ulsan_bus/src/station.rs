//! Station sensor
//!
//! Aggregates the arrival board of one stop. The station decides whether the
//! stop is polled at all (its active windows), drives the shared
//! [`BusArrivalApi`] and exposes every route as an attribute.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, trace};

use crate::api::BusArrivalApi;
use crate::bus::BusSensor;
use crate::config::StationConfig;
use crate::error::BusError;
use crate::format::format_arrival;
use crate::models::{ApiSnapshot, SYNC_DATE_FORMAT};
use crate::sensor::{
    Attributes, ICON_EYE_OFF, ICON_SIGN_CAUTION, ICON_STATION, STATE_ERROR, STATE_NONE, Sensor,
};
use crate::throttle::{STATION_REFRESH_INTERVAL_SECS, Throttle};
use crate::window::UpdateSchedule;

/// Sensor for a single bus stop
#[derive(Debug)]
pub struct StationSensor {
    config: StationConfig,
    schedule: UpdateSchedule,
    api: Arc<BusArrivalApi>,
    throttle: Throttle,
    window_active: Option<bool>,
    sync_date: Option<NaiveDateTime>,
    snapshot: Arc<ApiSnapshot>,
}

impl StationSensor {
    /// Create a station sensor backed by `api`
    #[must_use]
    pub fn new(config: StationConfig, api: Arc<BusArrivalApi>) -> Self {
        let schedule = config.schedule();
        let snapshot = api.snapshot();
        Self {
            config,
            schedule,
            api,
            throttle: Throttle::from_secs(STATION_REFRESH_INTERVAL_SECS),
            window_active: None,
            sync_date: None,
            snapshot,
        }
    }

    /// The station configuration
    #[must_use]
    pub const fn config(&self) -> &StationConfig {
        &self.config
    }

    /// The fetcher shared with this station's bus sensors
    #[must_use]
    pub fn api(&self) -> Arc<BusArrivalApi> {
        Arc::clone(&self.api)
    }

    /// The arrival state seen at the last refresh
    #[must_use]
    pub fn snapshot(&self) -> &ApiSnapshot {
        &self.snapshot
    }

    /// Whether the last refresh happened outside every active window
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.window_active == Some(false)
    }

    /// One bus sensor per route currently on the arrival board
    #[must_use]
    pub fn discover_buses(&self) -> Vec<BusSensor> {
        self.snapshot
            .arrivals
            .iter()
            .map(|(bus_id, record)| {
                BusSensor::new(&self.config, bus_id.clone(), Arc::clone(&self.api))
                    .with_record(record.clone())
            })
            .collect()
    }
}

/// The configured display name, if it is not blank
fn configured_name(config: &StationConfig) -> Option<&str> {
    config.name.as_deref().filter(|n| !n.trim().is_empty())
}

/// Station label used in names: the configured name, or `St.{id}`
pub(crate) fn station_label(config: &StationConfig) -> String {
    configured_name(config).map_or_else(|| format!("St.{}", config.station_id), str::to_string)
}

#[async_trait]
impl Sensor for StationSensor {
    async fn refresh(&mut self, now: NaiveDateTime) -> Result<(), BusError> {
        if !self.throttle.try_acquire(now) {
            trace!(station_id = %self.config.station_id, "Station refresh throttled");
            return Ok(());
        }

        let first_run = self.window_active.is_none();
        let active = self.schedule.is_active(now);
        self.window_active = Some(active);
        self.sync_date = Some(now);

        let result = if active || first_run {
            self.api.refresh(now).await
        } else {
            debug!(station_id = %self.config.station_id, "Station outside active window");
            Ok(())
        };

        self.snapshot = self.api.snapshot();
        result
    }

    fn entity_id(&self) -> String {
        format!("sensor.ulsan_bus_s{}", self.config.station_id)
    }

    fn name(&self) -> String {
        let label = station_label(&self.config);
        match configured_name(&self.config) {
            Some(_) => format!("{label}({})", self.config.station_id),
            None => label,
        }
    }

    fn state(&self) -> String {
        if self.snapshot.is_error() {
            return STATE_ERROR.to_string();
        }
        if self.is_suspended() {
            return STATE_NONE.to_string();
        }
        self.snapshot.arrivals.len().to_string()
    }

    fn icon(&self) -> &'static str {
        if self.snapshot.is_error() {
            ICON_SIGN_CAUTION
        } else if self.is_suspended() || !self.snapshot.update_allowed {
            ICON_EYE_OFF
        } else {
            ICON_STATION
        }
    }

    fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();

        if let Some(fault) = &self.snapshot.error {
            attrs.insert("API Error Code", fault.code.clone());
            attrs.insert("API Error Msg", fault.message.clone());
        }

        for (route_id, record) in &self.snapshot.arrivals {
            let mut label = if record.route_name.is_empty() {
                route_id.clone()
            } else {
                record.route_name.clone()
            };
            if attrs.get(&label).is_some() {
                label = format!("{label}({route_id})");
            }
            attrs.insert(label, format_arrival(&record.arrival_seconds));
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

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::client::MockBusArrivalClient;
    use crate::models::{ArrivalFeed, ArrivalRow};
    use crate::window::TimeWindow;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn row(route_id: &str, name: &str, arrival: &str) -> ArrivalRow {
        ArrivalRow {
            key: route_id.to_string(),
            route_id: route_id.to_string(),
            route_name: name.to_string(),
            arrival_seconds: arrival.to_string(),
        }
    }

    fn board() -> ArrivalFeed {
        ArrivalFeed::Arrivals(vec![
            row("196001337", "1337", "45"),
            row("196000124", "124", "0"),
            row("196000401", "401", "125"),
        ])
    }

    fn station(mock: MockBusArrivalClient, config: StationConfig) -> StationSensor {
        let api = Arc::new(BusArrivalApi::new(
            Arc::new(mock),
            config.station_id.clone(),
            config.schedule(),
        ));
        StationSensor::new(config, api)
    }

    #[test]
    fn test_name_with_and_without_display_name() {
        let unnamed = station(MockBusArrivalClient::new(), StationConfig::new("196040217"));
        assert_eq!(unnamed.name(), "St.196040217");

        let blank = station(
            MockBusArrivalClient::new(),
            StationConfig::new("196040217").with_name("  "),
        );
        assert_eq!(blank.name(), "St.196040217");
        let bus = BusSensor::new(blank.config(), "196000401", blank.api());
        assert_eq!(bus.name(), "St.196040217 196000401");

        let named = station(
            MockBusArrivalClient::new(),
            StationConfig::new("196040217").with_name("삼호교"),
        );
        assert_eq!(named.name(), "삼호교(196040217)");
        assert_eq!(named.entity_id(), "sensor.ulsan_bus_s196040217");
    }

    #[tokio::test]
    async fn test_refresh_inside_window_fetches() {
        let mut mock = MockBusArrivalClient::new();
        mock.expect_fetch_arrivals().times(1).returning(|_| Ok(board()));

        let config = StationConfig::new("1").with_window(TimeWindow::new("09:00", "18:00"));
        let mut sensor = station(mock, config);
        sensor.refresh(at(10, 0)).await.unwrap();

        assert_eq!(sensor.state(), "3");
        assert_eq!(sensor.icon(), ICON_STATION);
        assert!(!sensor.is_suspended());
    }

    #[tokio::test]
    async fn test_first_run_fetches_even_outside_window() {
        let mut mock = MockBusArrivalClient::new();
        mock.expect_fetch_arrivals().times(1).returning(|_| Ok(board()));

        let config = StationConfig::new("1").with_window(TimeWindow::new("09:00", "18:00"));
        let mut sensor = station(mock, config);
        sensor.refresh(at(20, 0)).await.unwrap();
        sensor.refresh(at(20, 5)).await.unwrap();

        assert!(sensor.is_suspended());
        assert_eq!(sensor.state(), "-");
        assert_eq!(sensor.icon(), ICON_EYE_OFF);
        assert_eq!(sensor.discover_buses().len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_is_throttled() {
        let mut mock = MockBusArrivalClient::new();
        mock.expect_fetch_arrivals().times(2).returning(|_| Ok(board()));

        let mut sensor = station(mock, StationConfig::new("1"));
        sensor.refresh(at(10, 0)).await.unwrap();
        sensor.refresh(at(10, 1)).await.unwrap();
        sensor.refresh(at(10, 2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_state_and_attributes() {
        let mut mock = MockBusArrivalClient::new();
        mock.expect_fetch_arrivals().returning(|_| {
            Ok(ArrivalFeed::Rejected {
                code: "30".to_string(),
                message: "SERVICE KEY IS NOT REGISTERED ERROR.".to_string(),
            })
        });

        let mut sensor = station(mock, StationConfig::new("1"));
        sensor.refresh(at(10, 0)).await.unwrap();

        assert_eq!(sensor.state(), "Error");
        assert_eq!(sensor.icon(), ICON_SIGN_CAUTION);
        let attrs = sensor.attributes();
        assert_eq!(attrs.get("API Error Code"), Some(&Value::from("30")));
        assert_eq!(
            attrs.get("API Error Msg"),
            Some(&Value::from("SERVICE KEY IS NOT REGISTERED ERROR."))
        );
    }

    #[tokio::test]
    async fn test_icon_when_fetcher_outside_service_day() {
        let mut mock = MockBusArrivalClient::new();
        mock.expect_fetch_arrivals().returning(|_| Ok(board()));

        let mut sensor = station(mock, StationConfig::new("1"));
        sensor.refresh(at(2, 0)).await.unwrap();

        assert!(!sensor.is_suspended());
        assert_eq!(sensor.icon(), ICON_EYE_OFF);
    }

    #[tokio::test]
    async fn test_attributes_sorted_by_route_id() {
        let mut mock = MockBusArrivalClient::new();
        mock.expect_fetch_arrivals().returning(|_| Ok(board()));

        let config = StationConfig::new("1").with_window(TimeWindow::new("09:00", "18:00"));
        let mut sensor = station(mock, config);
        sensor.refresh(at(10, 0)).await.unwrap();

        let attrs = sensor.attributes();
        let keys: Vec<&str> = attrs.keys().collect();
        assert_eq!(
            keys,
            vec!["124", "401", "1337", "Sync Date", "is Update", "update windows"]
        );
        assert_eq!(attrs.get("124"), Some(&Value::from("0")));
        assert_eq!(attrs.get("1337"), Some(&Value::from("45초")));
        assert_eq!(attrs.get("401"), Some(&Value::from("2분5초")));
        assert_eq!(attrs.get("Sync Date"), Some(&Value::from("2024-03-15 10:00:00")));
        assert_eq!(attrs.get("is Update"), Some(&Value::from(true)));
        assert_eq!(
            attrs.get("update windows"),
            Some(&Value::from(vec!["09:00~18:00".to_string()]))
        );
    }

    #[tokio::test]
    async fn test_duplicate_route_names_are_disambiguated() {
        let mut mock = MockBusArrivalClient::new();
        mock.expect_fetch_arrivals().returning(|_| {
            Ok(ArrivalFeed::Arrivals(vec![
                row("A", "401", "30"),
                row("B", "401", "90"),
            ]))
        });

        let mut sensor = station(mock, StationConfig::new("1"));
        sensor.refresh(at(10, 0)).await.unwrap();

        let attrs = sensor.attributes();
        assert_eq!(attrs.get("401"), Some(&Value::from("30초")));
        assert_eq!(attrs.get("401(B)"), Some(&Value::from("1분30초")));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let mut mock = MockBusArrivalClient::new();
        mock.expect_fetch_arrivals()
            .returning(|_| Err(BusError::ConnectionFailed("refused".to_string())));

        let mut sensor = station(mock, StationConfig::new("1"));
        let result = sensor.refresh(at(10, 0)).await;

        assert!(matches!(result, Err(BusError::ConnectionFailed(_))));
        assert_eq!(sensor.state(), "0");
    }

    #[test]
    fn test_attributes_before_first_refresh() {
        let sensor = station(MockBusArrivalClient::new(), StationConfig::new("1"));
        let attrs = sensor.attributes();
        assert_eq!(attrs.get("Sync Date"), Some(&Value::Null));
        assert_eq!(attrs.get("is Update"), Some(&Value::Null));
        assert_eq!(attrs.get("update windows"), Some(&Value::Null));
    }
}
