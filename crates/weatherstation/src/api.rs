//! Tempest cloud REST client.
//!
//! Read-only access to station metadata and latest observations. The token
//! travels as a `token` query parameter, the same way the websocket URL
//! carries it.

use std::future::Future;
use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::tempest::{DecodeError, ObservationTempest};

// ── Constants ───────────────────────────────────────────────────────

/// Public REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://swd.weatherflow.com/swd/rest";

/// Upper bound on a whole request, including reading the body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("invalid base url: {0}")]
    InvalidUrl(String),

    #[error("observation decode error: {0}")]
    Decode(#[from] DecodeError),
}

pub type Result<T> = std::result::Result<T, ApiError>;

// ── Station metadata ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiStatus {
    pub status_code: i64,
    pub status_message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceMeta {
    pub environment: String,
    pub name: String,
    pub wifi_network_name: String,
    pub agl: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub show_precip_final: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub device_id: i64,
    pub device_type: String,
    pub serial_number: String,
    pub firmware_revision: String,
    pub hardware_revision: String,
    pub location_id: i64,
    pub device_meta: DeviceMeta,
    pub device_settings: DeviceSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationItem {
    pub item: String,
    pub device_id: i64,
    pub location_id: i64,
    pub location_item_id: i64,
    pub sort: i64,
    pub station_id: i64,
    pub station_item_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationMeta {
    pub elevation: f64,
    pub share_with_wf: bool,
    pub share_with_wu: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Station {
    pub station_id: i64,
    pub name: String,
    pub public_name: String,
    pub timezone: String,
    #[serde(rename = "timezone_offset_minutes")]
    pub timezone_offset_mins: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub location_id: i64,
    pub created_epoch: i64,
    pub last_modified_epoch: i64,
    pub is_local_mode: bool,
    pub station_meta: StationMeta,
    pub devices: Vec<Device>,
    pub station_items: Vec<StationItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationMetadata {
    pub stations: Vec<Station>,
    pub status: ApiStatus,
}

impl StationMetadata {
    /// Every device of every station, with the station it belongs to.
    pub fn devices(&self) -> impl Iterator<Item = (&Station, &Device)> {
        self.stations
            .iter()
            .flat_map(|station| station.devices.iter().map(move |device| (station, device)))
    }
}

// ── Station observations ────────────────────────────────────────────

/// One reading of `/observations/station/{id}`, with named keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationObservation {
    pub timestamp: i64,
    pub air_temperature: f64,
    pub barometric_pressure: f64,
    pub station_pressure: f64,
    pub sea_level_pressure: f64,
    pub pressure_trend: String,
    pub relative_humidity: i64,
    pub precip: f64,
    pub precip_accum_last_1hr: f64,
    pub precip_accum_local_day: f64,
    pub precip_accum_local_day_final: f64,
    pub precip_accum_local_yesterday: f64,
    pub precip_accum_local_yesterday_final: f64,
    pub precip_analysis_type_yesterday: i64,
    pub precip_minutes_local_day: i64,
    pub precip_minutes_local_yesterday: i64,
    pub precip_minutes_local_yesterday_final: i64,
    pub wind_avg: f64,
    pub wind_direction: f64,
    pub wind_gust: f64,
    pub wind_lull: f64,
    pub solar_radiation: i64,
    pub uv: f64,
    pub brightness: i64,
    pub lightning_strike_count: i64,
    pub lightning_strike_count_last_1hr: i64,
    pub lightning_strike_count_last_3hr: i64,
    pub lightning_strike_last_distance: i64,
    pub lightning_strike_last_epoch: i64,
    pub feels_like: f64,
    pub heat_index: f64,
    pub wind_chill: f64,
    pub dew_point: f64,
    pub wet_bulb_temperature: f64,
    pub wet_bulb_globe_temperature: f64,
    pub delta_t: f64,
    pub air_density: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationUnits {
    pub units_temp: String,
    pub units_wind: String,
    pub units_precip: String,
    pub units_pressure: String,
    pub units_distance: String,
    pub units_direction: String,
    pub units_other: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationReport {
    pub station_id: i64,
    pub station_name: String,
    pub public_name: String,
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub is_public: bool,
    pub station_units: StationUnits,
    pub outdoor_keys: Vec<String>,
    #[serde(rename = "obs")]
    pub observations: Vec<StationObservation>,
    pub status: ApiStatus,
}

// ── Client ──────────────────────────────────────────────────────────

/// Operations of the REST API used by this crate.
pub trait TempestClient: Send + Sync {
    fn station_metadata(&self) -> impl Future<Output = Result<StationMetadata>> + Send;

    fn latest_station_observation(
        &self,
        station_id: i64,
    ) -> impl Future<Output = Result<ObservationReport>> + Send;

    fn latest_device_observation(
        &self,
        device_id: i64,
    ) -> impl Future<Output = Result<ObservationTempest>> + Send;
}

/// [`TempestClient`] over HTTPS.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl RestClient {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http: Self::http_client(DEFAULT_TIMEOUT)?,
            base_url,
            token: token.to_string(),
        })
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = Self::http_client(timeout)?;
        Ok(self)
    }

    fn http_client(timeout: Duration) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(timeout).build()?)
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("token", &self.token);
        Ok(url)
    }

    async fn get(&self, segments: &[&str]) -> Result<reqwest::Response> {
        let url = self.url(segments)?;
        log::debug!("GET {}", url.path());

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        Ok(self.get(segments).await?.json().await?)
    }
}

impl TempestClient for RestClient {
    async fn station_metadata(&self) -> Result<StationMetadata> {
        self.get_json(&["stations"]).await
    }

    async fn latest_station_observation(&self, station_id: i64) -> Result<ObservationReport> {
        let id = station_id.to_string();
        self.get_json(&["observations", "station", &id]).await
    }

    async fn latest_device_observation(&self, device_id: i64) -> Result<ObservationTempest> {
        let id = device_id.to_string();
        let body = self
            .get(&["observations", "device", &id])
            .await?
            .bytes()
            .await?;
        Ok(ObservationTempest::decode(&body)?)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
