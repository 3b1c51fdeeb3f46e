//! Ulsan BIS arrival client
//!
//! Fetches the arrival board of a single stop from the
//! `getBusArrivalInfo.xo` endpoint. The endpoint answers with XML even
//! though the request carries `type=json`.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::UlsanBusConfig;
use crate::error::BusError;
use crate::models::{ArrivalFeed, ArrivalRow};

/// Path of the arrival endpoint relative to the configured base URL
const ARRIVAL_PATH: &str = "/getBusArrivalInfo.xo";

/// Trait for bus arrival service clients
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BusArrivalClient: Send + Sync {
    /// Fetch the current arrival board for a stop
    async fn fetch_arrivals(&self, station_id: &str) -> Result<ArrivalFeed, BusError>;

    /// Check that the service answers and accepts the service key
    async fn is_healthy(&self) -> bool;
}

/// HTTP client for the Ulsan BIS open API
#[derive(Debug)]
pub struct UlsanBusClient {
    client: Client,
    config: UlsanBusConfig,
}

impl UlsanBusClient {
    /// Create a new Ulsan BIS client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &UlsanBusConfig) -> Result<Self, BusError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("ulsan-bus/1.0")
            .build()
            .map_err(|e| BusError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Full URL of the arrival endpoint
    fn arrival_url(&self) -> String {
        format!(
            "{}{ARRIVAL_PATH}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Query parameters for a stop
    fn query_params(&self, station_id: &str) -> Vec<(&'static str, String)> {
        vec![
            ("stopid", station_id.to_string()),
            ("pageNo", "1".to_string()),
            ("numOfRows", self.config.num_of_rows.to_string()),
            ("type", "json".to_string()),
            ("serviceKey", self.config.api_key().to_string()),
        ]
    }

    /// Parse the XML arrival document into a feed
    fn parse_arrivals_response(body: &str) -> Result<ArrivalFeed, BusError> {
        let raw: RawTableInfo =
            quick_xml::de::from_str(body).map_err(|e| BusError::ParseError(e.to_string()))?;

        let code = raw.result_code.trim().to_string();
        let succeeded = code.parse::<i64>().is_ok_and(|c| c == 0);

        if !succeeded {
            let message = [raw.msg, raw.header_msg, raw.result_msg]
                .into_iter()
                .flatten()
                .map(|m| m.trim().to_string())
                .find(|m| !m.is_empty())
                .unwrap_or_default();

            return Ok(ArrivalFeed::Rejected { code, message });
        }

        let rows = raw
            .list
            .map(|list| list.row)
            .unwrap_or_default()
            .into_iter()
            .map(Self::convert_row)
            .collect();

        Ok(ArrivalFeed::Arrivals(rows))
    }

    /// Convert a raw row to a typed row
    fn convert_row(raw: RawRow) -> ArrivalRow {
        let route_id = raw.route_id.trim().to_string();
        let key = raw
            .attr_route_id
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| route_id.clone());

        ArrivalRow {
            key,
            route_id,
            route_name: raw.route_name.trim().to_string(),
            arrival_seconds: raw.arrival_time.trim().to_string(),
        }
    }
}

#[async_trait]
impl BusArrivalClient for UlsanBusClient {
    #[instrument(skip(self))]
    async fn fetch_arrivals(&self, station_id: &str) -> Result<ArrivalFeed, BusError> {
        let url = self.arrival_url();

        debug!(?url, "Fetching bus arrivals");

        let response = self
            .client
            .get(&url)
            .query(&self.query_params(station_id))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BusError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                } else {
                    BusError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BusError::RequestFailed(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BusError::ParseError(e.to_string()))?;

        let feed = Self::parse_arrivals_response(&body)?;

        match &feed {
            ArrivalFeed::Arrivals(rows) => debug!(count = rows.len(), "Arrivals received"),
            ArrivalFeed::Rejected { code, .. } => warn!(%code, "Arrival request rejected"),
        }

        Ok(feed)
    }

    /// Fetches the board of the first configured stop; a rejected service
    /// key counts as unhealthy.
    async fn is_healthy(&self) -> bool {
        let Some(station) = self.config.stations.first() else {
            warn!("No station configured for the health check");
            return false;
        };

        match self.fetch_arrivals(&station.station_id).await {
            Ok(ArrivalFeed::Arrivals(_)) => true,
            Ok(ArrivalFeed::Rejected { .. }) => false,
            Err(e) => {
                warn!(error = %e, "Health check failed");
                false
            },
        }
    }
}

// --- Raw API response types for deserialization ---

#[derive(Debug, Deserialize)]
struct RawTableInfo {
    #[serde(rename = "resultCode")]
    result_code: String,
    #[serde(rename = "Msg", default)]
    msg: Option<String>,
    #[serde(rename = "headerMsg", default)]
    header_msg: Option<String>,
    #[serde(rename = "resultMsg", default)]
    result_msg: Option<String>,
    #[serde(default)]
    list: Option<RawList>,
}

#[derive(Debug, Default, Deserialize)]
struct RawList {
    #[serde(default)]
    row: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "ROUTEID")]
    route_id: String,
    #[serde(rename = "ROUTENM", default)]
    route_name: String,
    #[serde(rename = "ARRIVALTIME", default)]
    arrival_time: String,
    #[serde(rename = "ATTR_ROUTE_ID", default)]
    attr_route_id: Option<String>,
}
