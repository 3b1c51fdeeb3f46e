//! Application configuration loading

use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use integration_ulsan_bus::UlsanBusConfig;
use serde::Deserialize;

/// Environment variable prefix, e.g. `ULSAN_BUS_API_KEY`
const ENV_PREFIX: &str = "ULSAN_BUS";

/// Configuration file looked up in the working directory when none is given
const DEFAULT_CONFIG_NAME: &str = "ulsan_bus";

/// Top-level configuration of the CLI
///
/// The host settings and the bus integration settings share the top level of
/// the file but are deserialized in two passes, so that every value comes
/// straight out of the merged configuration with its own type coercion.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IANA timezone used to evaluate active windows
    pub timezone: String,

    /// Seconds between two polling ticks
    pub tick_secs: u64,

    /// Ulsan BIS API and station settings
    pub bus: UlsanBusConfig,
}

/// Host-only keys of the top-level table
#[derive(Debug, Deserialize)]
struct HostSettings {
    #[serde(default = "default_timezone")]
    timezone: String,

    #[serde(default = "default_tick_secs")]
    tick_secs: u64,
}

fn default_timezone() -> String {
    "Asia/Seoul".to_string()
}

const fn default_tick_secs() -> u64 {
    10
}

impl AppConfig {
    /// Load configuration from defaults, a TOML file and the environment
    ///
    /// With `path` set the file must exist; otherwise `ulsan_bus.toml` in the
    /// working directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        // Override with environment variables (e.g., ULSAN_BUS_API_KEY)
        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__");

        Self::load_with_env(path, environment)
    }

    fn load_with_env(
        path: Option<&Path>,
        environment: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path.to_path_buf())
                .format(config::FileFormat::Toml)
                .required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config = config::Config::builder()
            .set_default("timezone", default_timezone())?
            .set_default("tick_secs", default_tick_secs())?
            .add_source(file)
            .add_source(environment)
            .build()?;

        let host: HostSettings = config.clone().try_deserialize()?;
        let bus: UlsanBusConfig = config.try_deserialize()?;

        Ok(Self {
            timezone: host.timezone,
            tick_secs: host.tick_secs,
            bus,
        })
    }

    /// The configured timezone
    pub fn tz(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| format!("invalid timezone {}: {e}", self.timezone))
    }

    /// Current wall-clock time in the configured timezone
    pub fn local_now(&self) -> Result<NaiveDateTime, String> {
        Ok(Utc::now().with_timezone(&self.tz()?).naive_local())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.tz()?;

        if self.tick_secs == 0 {
            return Err("tick_secs must be greater than 0".to_string());
        }

        self.bus.validate().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_full_file() {
        let file = write_config(
            r#"
            timezone = "Asia/Seoul"
            tick_secs = 15
            api_key = "service-key"
            api_issued_date = "2024-01-01"

            [[stations]]
            station_id = "196040217"
            name = "삼호교"

            [[stations.update_time]]
            start_time = "07:00"
            end_time = "09:00"

            [[stations.buses]]
            bus_id = "196000401"
            name = "출근 버스"
            "#,
        );

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.tick_secs, 15);
        assert_eq!(config.bus.api_key(), "service-key");
        assert_eq!(config.bus.api_issued_date.as_deref(), Some("2024-01-01"));
        assert_eq!(config.bus.timeout_secs, 10);
        assert_eq!(config.bus.stations.len(), 1);
        assert_eq!(config.bus.stations[0].update_time.len(), 1);
        assert_eq!(config.bus.stations[0].buses[0].bus_id, "196000401");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_applies_defaults() {
        let file = write_config(
            r#"
            api_key = "service-key"

            [[stations]]
            station_id = "196040217"
            "#,
        );

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.timezone, "Asia/Seoul");
        assert_eq!(config.tick_secs, 10);
        assert!(config.bus.stations[0].name.is_none());
    }

    #[test]
    fn load_missing_required_file_fails() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/ulsan_bus.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_unknown_timezone() {
        let file = write_config(
            r#"
            timezone = "Mars/Olympus"
            api_key = "service-key"

            [[stations]]
            station_id = "196040217"
            "#,
        );

        let config = AppConfig::load(Some(file.path())).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("Mars/Olympus"));
    }

    fn env_source(vars: &[(&str, &str)]) -> config::Environment {
        let vars = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();

        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .source(Some(vars))
    }

    #[test]
    fn env_overrides_numeric_keys() {
        let file = write_config(
            r#"
            api_key = "service-key"
            timeout_secs = 20

            [[stations]]
            station_id = "196040217"
            "#,
        );

        let config = AppConfig::load_with_env(
            Some(file.path()),
            env_source(&[
                ("ULSAN_BUS_TIMEOUT_SECS", "5"),
                ("ULSAN_BUS_NUM_OF_ROWS", "30"),
                ("ULSAN_BUS_TICK_SECS", "45"),
            ]),
        )
        .unwrap();

        assert_eq!(config.bus.timeout_secs, 5);
        assert_eq!(config.bus.num_of_rows, 30);
        assert_eq!(config.tick_secs, 45);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_string_keys() {
        let file = write_config(
            r#"
            api_key = "file-key"
            timezone = "Asia/Seoul"

            [[stations]]
            station_id = "196040217"
            "#,
        );

        let config = AppConfig::load_with_env(
            Some(file.path()),
            env_source(&[
                ("ULSAN_BUS_API_KEY", "12345"),
                ("ULSAN_BUS_TIMEZONE", "UTC"),
            ]),
        )
        .unwrap();

        assert_eq!(config.bus.api_key(), "12345");
        assert_eq!(config.timezone, "UTC");
    }

    #[test]
    fn validate_rejects_missing_stations() {
        let file = write_config(r#"api_key = "service-key""#);

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert!(config.validate().is_err());
    }
}
