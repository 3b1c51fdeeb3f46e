//! Ulsan bus integration configuration

use std::collections::HashSet;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::BusError;
use crate::window::{TimeWindow, UpdateSchedule};

/// Configuration for the Ulsan BIS open API and the stations to watch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UlsanBusConfig {
    /// Service key issued by the open data portal (sensitive)
    #[serde(skip_serializing, default = "empty_secret")]
    pub api_key: SecretString,

    /// Date the service key was issued (informational only)
    #[serde(default)]
    pub api_issued_date: Option<String>,

    /// Base URL of the Ulsan BIS API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of rows requested per station
    #[serde(default = "default_num_of_rows")]
    pub num_of_rows: u32,

    /// Stations to poll
    #[serde(default)]
    pub stations: Vec<StationConfig>,
}

/// A single bus stop to poll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StationConfig {
    /// Provider-assigned stop id
    pub station_id: String,

    /// Display name of the stop
    #[serde(default)]
    pub name: Option<String>,

    /// Windows during which the stop is polled (empty = always)
    #[serde(default)]
    pub update_time: Vec<TimeWindow>,

    /// Optional per-route overrides
    #[serde(default)]
    pub buses: Vec<BusConfig>,
}

impl StationConfig {
    /// Create a station with no name and no windows
    #[must_use]
    pub fn new(station_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            name: None,
            update_time: Vec::new(),
            buses: Vec::new(),
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add an active time window
    #[must_use]
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.update_time.push(window);
        self
    }

    /// Add a per-route override
    #[must_use]
    pub fn with_bus(mut self, bus: BusConfig) -> Self {
        self.buses.push(bus);
        self
    }

    /// The configured windows as a schedule
    #[must_use]
    pub fn schedule(&self) -> UpdateSchedule {
        UpdateSchedule::new(self.update_time.clone())
    }

    /// Look up the override for a route id
    #[must_use]
    pub fn bus(&self, bus_id: &str) -> Option<&BusConfig> {
        self.buses.iter().find(|b| b.bus_id == bus_id)
    }
}

/// Per-route override
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusConfig {
    /// Route id as reported by the API
    pub bus_id: String,

    /// Explicit sensor name
    #[serde(default)]
    pub name: Option<String>,
}

fn default_base_url() -> String {
    "http://openapi.its.ulsan.kr/UlsanAPI".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_num_of_rows() -> u32 {
    100
}

fn invalid(message: impl Into<String>) -> BusError {
    BusError::ConfigurationError(message.into())
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

impl Default for UlsanBusConfig {
    fn default() -> Self {
        Self {
            api_key: empty_secret(),
            api_issued_date: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            num_of_rows: default_num_of_rows(),
            stations: Vec::new(),
        }
    }
}

impl UlsanBusConfig {
    /// Create a configuration with the given service key and defaults otherwise
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            ..Default::default()
        }
    }

    /// Create a configuration suitable for testing
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            timeout_secs: 5,
            stations: vec![StationConfig::new("196040217")],
            ..Self::new("test-service-key")
        }
    }

    /// Get the service key as a string reference
    #[must_use]
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Validate the configuration
    ///
    /// Malformed window strings are accepted here; they simply never match.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::ConfigurationError`] if the configuration is invalid.
    pub fn validate(&self) -> Result<(), BusError> {
        if self.base_url.is_empty() {
            return Err(invalid("base_url must not be empty"));
        }

        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs must be greater than 0"));
        }

        if self.num_of_rows == 0 {
            return Err(invalid("num_of_rows must be greater than 0"));
        }

        if self.api_key().trim().is_empty() {
            return Err(invalid("api_key must not be empty"));
        }

        if self.stations.is_empty() {
            return Err(invalid("at least one station must be configured"));
        }

        let mut seen = HashSet::new();
        for station in &self.stations {
            if station.station_id.trim().is_empty() {
                return Err(invalid("station_id must not be empty"));
            }
            if !seen.insert(station.station_id.as_str()) {
                return Err(invalid(format!("duplicate station_id {}", station.station_id)));
            }
        }

        Ok(())
    }
}
