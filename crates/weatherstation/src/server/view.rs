use serde::{Deserialize, Serialize};

use crate::tempest::ObservationTempest;

/// Display-ready observation in US units, as sent to dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationView {
    pub device_id: i64,
    pub epoch: i64,
    /// RFC 3339, empty when the epoch is out of range
    pub time: String,
    pub temperature_f: f64,
    pub feels_like_f: f64,
    pub dew_point_f: f64,
    pub wind_chill_f: f64,
    pub heat_index_f: f64,
    pub humidity: i64,
    pub pressure_mb: f64,
    pub pressure_trend: String,
    pub wind_avg_mph: f64,
    pub wind_gust_mph: f64,
    pub wind_lull_mph: f64,
    pub wind_direction: String,
    pub wind_direction_degrees: f64,
    pub rain_inches: f64,
    pub rain_today_inches: f64,
    pub rain_yesterday_inches: f64,
    pub is_raining: bool,
    pub precipitation: String,
    pub uv_index: f64,
    pub solar_radiation: i64,
    pub illuminance: i64,
    pub lightning_strikes: i64,
    pub lightning_distance_miles: f64,
    pub strikes_1h: i64,
    pub strikes_3h: i64,
    pub battery_volts: f64,
}

impl From<&ObservationTempest> for ObservationView {
    fn from(obs: &ObservationTempest) -> Self {
        Self {
            device_id: obs.device_id,
            epoch: obs.data.time_epoch,
            time: obs
                .observed_at()
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
            temperature_f: obs.temperature_fahrenheit(),
            feels_like_f: obs.feels_like_fahrenheit(),
            dew_point_f: obs.dew_point_fahrenheit(),
            wind_chill_f: obs.wind_chill_fahrenheit(),
            heat_index_f: obs.heat_index_fahrenheit(),
            humidity: obs.data.relative_humidity,
            pressure_mb: obs.data.station_pressure,
            pressure_trend: obs.summary.pressure_trend.clone(),
            wind_avg_mph: obs.wind_speed_average_mph(),
            wind_gust_mph: obs.wind_speed_gust_mph(),
            wind_lull_mph: obs.wind_speed_lull_mph(),
            wind_direction: obs.wind_direction().to_string(),
            wind_direction_degrees: obs.data.wind_direction_degrees,
            rain_inches: obs.rainfall_inches(),
            rain_today_inches: obs.rainfall_today_inches(),
            rain_yesterday_inches: obs.rainfall_yesterday_inches(),
            is_raining: obs.is_raining(),
            precipitation: obs.precipitation_type().to_string(),
            uv_index: obs.data.uv_index,
            solar_radiation: obs.data.solar_radiation,
            illuminance: obs.data.illuminance,
            lightning_strikes: obs.data.lightning_strike_count,
            lightning_distance_miles: obs.average_lightning_strike_distance_miles(),
            strikes_1h: obs.summary.strike_count_1h,
            strikes_3h: obs.summary.strike_count_3h,
            battery_volts: obs.data.battery_volts,
        }
    }
}

/// One sample of the history chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Unix seconds
    pub time: i64,
    pub temperature_f: f64,
    pub humidity: i64,
    pub pressure_mb: f64,
    pub wind_mph: f64,
}

impl From<&ObservationTempest> for HistoryPoint {
    fn from(obs: &ObservationTempest) -> Self {
        Self {
            time: obs.data.time_epoch,
            temperature_f: obs.temperature_fahrenheit(),
            humidity: obs.data.relative_humidity,
            pressure_mb: obs.data.station_pressure,
            wind_mph: obs.wind_speed_average_mph(),
        }
    }
}
