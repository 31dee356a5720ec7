//! Unit conversions and derived readings.

use std::fmt;

use chrono::{DateTime, Utc};

use super::observation::ObservationTempest;

const MPS_TO_MPH: f64 = 2.23694;
const MM_TO_INCHES: f64 = 0.03937;
const KM_TO_MILES: f64 = 0.621371;

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn meters_per_second_to_mph(mps: f64) -> f64 {
    mps * MPS_TO_MPH
}

pub fn millimeters_to_inches(mm: f64) -> f64 {
    mm * MM_TO_INCHES
}

pub fn kilometers_to_miles(km: f64) -> f64 {
    km * KM_TO_MILES
}

/// 16-point compass name for a bearing. Any finite angle is accepted.
pub fn compass_direction(degrees: f64) -> &'static str {
    let step = 360.0 / COMPASS_POINTS.len() as f64;
    let normalized = degrees.rem_euclid(360.0);
    let index = (normalized / step + 0.5) as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}

/// Precipitation type reported in the observation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecipitationType {
    Dry,
    Rain,
    Hail,
    RainAndHail,
}

impl PrecipitationType {
    /// Unknown codes read as dry.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Rain,
            2 => Self::Hail,
            3 => Self::RainAndHail,
            _ => Self::Dry,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Dry => "Dry",
            Self::Rain => "Raining",
            Self::Hail => "Hailing",
            Self::RainAndHail => "Rain and hail",
        }
    }
}

impl fmt::Display for PrecipitationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ObservationTempest {
    /// True when the precipitation analysis reports rain (type 1 or 2).
    pub fn is_raining(&self) -> bool {
        matches!(self.data.precipitation_analysis_type, 1 | 2)
    }

    pub fn precipitation_type(&self) -> PrecipitationType {
        PrecipitationType::from_code(self.data.precipitation_type)
    }

    pub fn wind_direction(&self) -> &'static str {
        compass_direction(self.data.wind_direction_degrees)
    }

    pub fn wind_speed_lull_mph(&self) -> f64 {
        meters_per_second_to_mph(self.data.wind_lull)
    }

    pub fn wind_speed_average_mph(&self) -> f64 {
        meters_per_second_to_mph(self.data.wind_average)
    }

    pub fn wind_speed_gust_mph(&self) -> f64 {
        meters_per_second_to_mph(self.data.wind_gust)
    }

    pub fn rainfall_inches(&self) -> f64 {
        millimeters_to_inches(self.data.rain_accumulated)
    }

    pub fn rainfall_today_inches(&self) -> f64 {
        millimeters_to_inches(self.data.local_daily_rain_accumulation)
    }

    pub fn rainfall_yesterday_inches(&self) -> f64 {
        millimeters_to_inches(self.summary.precip_accum_local_yesterday)
    }

    pub fn temperature_fahrenheit(&self) -> f64 {
        celsius_to_fahrenheit(self.data.air_temperature)
    }

    pub fn feels_like_fahrenheit(&self) -> f64 {
        celsius_to_fahrenheit(self.summary.feels_like)
    }

    pub fn dew_point_fahrenheit(&self) -> f64 {
        celsius_to_fahrenheit(self.summary.dew_point)
    }

    pub fn wind_chill_fahrenheit(&self) -> f64 {
        celsius_to_fahrenheit(self.summary.wind_chill)
    }

    pub fn heat_index_fahrenheit(&self) -> f64 {
        celsius_to_fahrenheit(self.summary.heat_index)
    }

    pub fn average_lightning_strike_distance_miles(&self) -> f64 {
        kilometers_to_miles(self.data.lightning_strike_avg_distance)
    }

    pub fn last_strike_distance_miles(&self) -> f64 {
        kilometers_to_miles(self.summary.strike_last_dist as f64)
    }

    /// Observation time, `None` if the epoch is out of range.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.data.time_epoch, 0)
    }
}
