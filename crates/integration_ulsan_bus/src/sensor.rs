//! Sensor abstraction shared by station and bus sensors

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::BusError;

/// Icon of a station sensor in its default state
pub const ICON_STATION: &str = "mdi:nature-people";
/// Icon of a bus sensor in its default state
pub const ICON_BUS: &str = "mdi:bus";
/// Icon of a bus sensor outside its active window
pub const ICON_BUS_READY: &str = "mdi:bus-clock";
/// Icon of a bus sensor whose route is missing from the arrival board
pub const ICON_BUS_ALERT: &str = "mdi:bus-alert";
/// Icon of a station whose last request was rejected by the API
pub const ICON_SIGN_CAUTION: &str = "mdi:sign-caution";
/// Icon of a station outside its active window
pub const ICON_EYE_OFF: &str = "mdi:eye-off";

/// State shown while a sensor is suspended or has no data
pub const STATE_NONE: &str = "-";
/// State of a station whose last request was rejected by the API
pub const STATE_ERROR: &str = "Error";

/// Ordered attribute map
///
/// Keeps insertion order so that route entries stay sorted by route id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, Value)>,
}

impl Attributes {
    /// Create an empty attribute map
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace an attribute
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Look up an attribute
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Attribute keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of attributes
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no attributes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Point-in-time view of a sensor, as handed to a dashboard
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SensorState {
    /// Stable entity id
    pub entity_id: String,
    /// Display name
    pub name: String,
    /// State string
    pub state: String,
    /// Icon identifier
    pub icon: &'static str,
    /// Extra attributes
    pub attributes: Attributes,
}

/// A polled sensor
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Refresh the sensor at local time `now`, subject to its throttle
    async fn refresh(&mut self, now: NaiveDateTime) -> Result<(), BusError>;

    /// Stable entity id
    fn entity_id(&self) -> String;

    /// Display name
    fn name(&self) -> String;

    /// Current state string
    fn state(&self) -> String;

    /// Current icon
    fn icon(&self) -> &'static str;

    /// Current attributes
    fn attributes(&self) -> Attributes;

    /// Snapshot of everything a dashboard shows
    fn state_snapshot(&self) -> SensorState {
        SensorState {
            entity_id: self.entity_id(),
            name: self.name(),
            state: self.state(),
            icon: self.icon(),
            attributes: self.attributes(),
        }
    }
}
