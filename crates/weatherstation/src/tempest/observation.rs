//! Decoder for `obs_st` messages.
//!
//! The device sends each reading as a positional array under `obs`:
//!
//! ```text
//! {"type":"obs_st","device_id":1234,"obs":[[1700000060,0.3,1.2,2.5,182, ... ]]}
//! ```
//!
//! Only the first inner array is used. It must hold exactly
//! [`OBSERVATION_FIELDS`] numbers; anything else is rejected rather than
//! producing a partially filled [`ObservationTempestData`].

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Number of elements in one positional observation row.
pub const OBSERVATION_FIELDS: usize = 22;

/// Field names in wire order.
pub const FIELD_NAMES: [&str; OBSERVATION_FIELDS] = [
    "time_epoch",
    "wind_lull",
    "wind_average",
    "wind_gust",
    "wind_direction_degrees",
    "wind_sample_interval",
    "station_pressure",
    "air_temperature",
    "relative_humidity",
    "illuminance",
    "uv_index",
    "solar_radiation",
    "rain_accumulated",
    "precipitation_type",
    "lightning_strike_avg_distance",
    "lightning_strike_count",
    "battery_volts",
    "report_interval",
    "local_daily_rain_accumulation",
    "rain_accumulation_final_check",
    "local_rain_accumulation_final_check",
    "precipitation_analysis_type",
];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid observation event: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no observation data in payload")]
    NoObservationData,

    #[error("observation data is missing: got {got}, expected {expected}")]
    FieldCount { got: usize, expected: usize },

    #[error("observation field {index} ({field}) is not a number")]
    FieldType { index: usize, field: &'static str },
}

/// One positional observation row with named fields.
///
/// Units are as sent by the device: m/s, degrees, mb, °C, %, lux, W/m², mm,
/// km, volts, minutes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTempestData {
    pub time_epoch: i64,
    pub wind_lull: f64,
    pub wind_average: f64,
    pub wind_gust: f64,
    pub wind_direction_degrees: f64,
    pub wind_sample_interval: i64,
    pub station_pressure: f64,
    pub air_temperature: f64,
    pub relative_humidity: i64,
    pub illuminance: i64,
    pub uv_index: f64,
    pub solar_radiation: i64,
    pub rain_accumulated: f64,
    pub precipitation_type: i64,
    pub lightning_strike_avg_distance: f64,
    pub lightning_strike_count: i64,
    pub battery_volts: f64,
    pub report_interval: i64,
    pub local_daily_rain_accumulation: f64,
    pub rain_accumulation_final_check: f64,
    pub local_rain_accumulation_final_check: f64,
    pub precipitation_analysis_type: i64,
}

fn int_at(row: &[Value], index: usize) -> Result<i64, DecodeError> {
    let value = &row[index];
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .ok_or(DecodeError::FieldType {
            index,
            field: FIELD_NAMES[index],
        })
}

fn float_at(row: &[Value], index: usize) -> Result<f64, DecodeError> {
    row[index].as_f64().ok_or(DecodeError::FieldType {
        index,
        field: FIELD_NAMES[index],
    })
}

impl ObservationTempestData {
    /// Build from the decoded `obs` rows, using the first row.
    pub fn from_rows(rows: &[Vec<Value>]) -> Result<Self, DecodeError> {
        let row = rows.first().ok_or(DecodeError::NoObservationData)?;
        if row.len() != OBSERVATION_FIELDS {
            return Err(DecodeError::FieldCount {
                got: row.len(),
                expected: OBSERVATION_FIELDS,
            });
        }

        Ok(Self {
            time_epoch: int_at(row, 0)?,
            wind_lull: float_at(row, 1)?,
            wind_average: float_at(row, 2)?,
            wind_gust: float_at(row, 3)?,
            wind_direction_degrees: float_at(row, 4)?,
            wind_sample_interval: int_at(row, 5)?,
            station_pressure: float_at(row, 6)?,
            air_temperature: float_at(row, 7)?,
            relative_humidity: int_at(row, 8)?,
            illuminance: int_at(row, 9)?,
            uv_index: float_at(row, 10)?,
            solar_radiation: int_at(row, 11)?,
            rain_accumulated: float_at(row, 12)?,
            precipitation_type: int_at(row, 13)?,
            lightning_strike_avg_distance: float_at(row, 14)?,
            lightning_strike_count: int_at(row, 15)?,
            battery_volts: float_at(row, 16)?,
            report_interval: int_at(row, 17)?,
            local_daily_rain_accumulation: float_at(row, 18)?,
            rain_accumulation_final_check: float_at(row, 19)?,
            local_rain_accumulation_final_check: float_at(row, 20)?,
            precipitation_analysis_type: int_at(row, 21)?,
        })
    }

    /// Decode the JSON value of an `obs` key.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let rows: Vec<Vec<Value>> = serde_json::from_slice(bytes)?;
        Self::from_rows(&rows)
    }

    /// The positional row this observation decodes from.
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            self.time_epoch.into(),
            self.wind_lull.into(),
            self.wind_average.into(),
            self.wind_gust.into(),
            self.wind_direction_degrees.into(),
            self.wind_sample_interval.into(),
            self.station_pressure.into(),
            self.air_temperature.into(),
            self.relative_humidity.into(),
            self.illuminance.into(),
            self.uv_index.into(),
            self.solar_radiation.into(),
            self.rain_accumulated.into(),
            self.precipitation_type.into(),
            self.lightning_strike_avg_distance.into(),
            self.lightning_strike_count.into(),
            self.battery_volts.into(),
            self.report_interval.into(),
            self.local_daily_rain_accumulation.into(),
            self.rain_accumulation_final_check.into(),
            self.local_rain_accumulation_final_check.into(),
            self.precipitation_analysis_type.into(),
        ]
    }
}

impl<'de> Deserialize<'de> for ObservationTempestData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<Value>>::deserialize(deserializer)?;
        Self::from_rows(&rows).map_err(de::Error::custom)
    }
}

impl Serialize for ObservationTempestData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.to_row()].serialize(serializer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(rename = "status_code", default)]
    pub code: i64,
    #[serde(rename = "status_message", default)]
    pub message: String,
}

/// Server-side derived metrics sent alongside each observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationTempestSummary {
    pub pressure_trend: String,
    pub strike_count_1h: i64,
    pub strike_count_3h: i64,
    pub precip_total_1h: f64,
    pub strike_last_dist: i64,
    pub strike_last_epoch: i64,
    pub precip_accum_local_yesterday: f64,
    pub precip_accum_local_yesterday_final: f64,
    pub feels_like: f64,
    pub heat_index: f64,
    pub wind_chill: f64,
    pub dew_point: f64,
    #[serde(alias = "web_bulb_temperature")]
    pub wet_bulb_temperature: f64,
    pub air_density: f64,
    pub delta_t: f64,
    pub precip_minutes_local_day: i64,
    pub precip_minutes_local_yesterday: i64,
}

/// A decoded `obs_st` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationTempest {
    #[serde(default)]
    pub status: Status,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub device_id: i64,
    #[serde(default)]
    pub summary: ObservationTempestSummary,
    #[serde(rename = "obs")]
    pub data: ObservationTempestData,
}

/// Named fields of an observation message with `obs` left undecoded.
#[derive(Deserialize)]
struct RawObservation {
    #[serde(default)]
    status: Status,
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    device_id: i64,
    #[serde(default)]
    summary: ObservationTempestSummary,
    #[serde(default)]
    obs: Vec<Vec<Value>>,
}

impl ObservationTempest {
    /// Decode a raw `obs_st` message.
    ///
    /// Unlike going through `Deserialize`, positional failures keep their
    /// [`DecodeError`] variant.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let raw: RawObservation = serde_json::from_slice(bytes)?;
        Ok(Self {
            data: ObservationTempestData::from_rows(&raw.obs)?,
            status: raw.status,
            event_type: raw.event_type,
            source: raw.source,
            device_id: raw.device_id,
            summary: raw.summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tempest::fixtures::OBS_ST;
    use serde_json::json;

    fn sample_row() -> Vec<Value> {
        let value: Value = serde_json::from_str(OBS_ST).unwrap();
        value["obs"][0].as_array().unwrap().clone()
    }

    #[test]
    fn test_decode_sample_observation() {
        let obs = ObservationTempest::decode(OBS_ST.as_bytes()).unwrap();
        assert_eq!(obs.event_type, "obs_st");
        assert_eq!(obs.device_id, 12345);
        assert_eq!(obs.source, "cache");
        assert_eq!(obs.status.code, 0);
        assert_eq!(obs.status.message, "SUCCESS");
        assert_eq!(obs.summary.pressure_trend, "falling");
        assert_eq!(obs.summary.strike_count_3h, 5);
        assert_eq!(obs.summary.wet_bulb_temperature, 15.8);

        let data = &obs.data;
        assert_eq!(data.time_epoch, 1_700_000_060);
        assert_eq!(data.wind_average, 1.2);
        assert_eq!(data.wind_direction_degrees, 182.0);
        assert_eq!(data.air_temperature, 21.5);
        assert_eq!(data.relative_humidity, 55);
        assert_eq!(data.illuminance, 12000);
        assert_eq!(data.precipitation_type, 1);
        assert_eq!(data.battery_volts, 2.61);
        assert_eq!(data.precipitation_analysis_type, 1);
    }

    #[test]
    fn test_positional_round_trip() {
        let row = sample_row();
        let data = ObservationTempestData::from_rows(&[row]).unwrap();
        let again = ObservationTempestData::from_rows(&[data.to_row()]).unwrap();
        assert_eq!(data, again);

        let encoded = serde_json::to_vec(&data).unwrap();
        assert_eq!(ObservationTempestData::decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_wrong_field_counts_fail() {
        for len in [0, 21, 23] {
            let row = vec![json!(1); len];
            let err = ObservationTempestData::from_rows(&[row]).unwrap_err();
            assert!(
                matches!(err, DecodeError::FieldCount { got, expected: 22 } if got == len),
                "length {} gave {:?}",
                len,
                err
            );
        }
    }

    #[test]
    fn test_field_count_message() {
        let err = ObservationTempestData::decode(b"[[1,2,3]]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "observation data is missing: got 3, expected 22"
        );
    }

    #[test]
    fn test_empty_outer_array() {
        let err = ObservationTempestData::decode(b"[]").unwrap_err();
        assert!(matches!(err, DecodeError::NoObservationData));
        assert_eq!(err.to_string(), "no observation data in payload");
    }

    #[test]
    fn test_only_first_row_is_used() {
        let mut second = sample_row();
        second[0] = json!(1);
        let data = ObservationTempestData::from_rows(&[sample_row(), second]).unwrap();
        assert_eq!(data.time_epoch, 1_700_000_060);
    }

    #[test]
    fn test_non_numeric_field_names_index() {
        let mut row = sample_row();
        row[7] = json!("warm");
        let err = ObservationTempestData::from_rows(&[row]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::FieldType {
                index: 7,
                field: "air_temperature"
            }
        ));

        let mut row = sample_row();
        row[21] = Value::Null;
        let err = ObservationTempestData::from_rows(&[row]).unwrap_err();
        assert!(matches!(err, DecodeError::FieldType { index: 21, .. }));
    }

    #[test]
    fn test_integer_fields_truncate_floats() {
        let mut row = sample_row();
        row[8] = json!(55.9);
        let data = ObservationTempestData::from_rows(&[row]).unwrap();
        assert_eq!(data.relative_humidity, 55);
    }

    #[test]
    fn test_missing_obs_is_no_data() {
        let err = ObservationTempest::decode(br#"{"type":"obs_st"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::NoObservationData));
    }

    #[test]
    fn test_invalid_json() {
        let err = ObservationTempest::decode(b"{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_summary_defaults_and_legacy_key() {
        let row = sample_row();
        let message = json!({
            "type": "obs_st",
            "summary": {"web_bulb_temperature": 9.5},
            "obs": [row],
        });
        let obs = ObservationTempest::decode(message.to_string().as_bytes()).unwrap();
        assert_eq!(obs.summary.wet_bulb_temperature, 9.5);
        assert_eq!(obs.summary.pressure_trend, "");
        assert_eq!(obs.summary.strike_count_1h, 0);
        assert_eq!(obs.status, Status::default());
    }

    #[test]
    fn test_serde_round_trip_of_full_message() {
        let obs = ObservationTempest::decode(OBS_ST.as_bytes()).unwrap();
        let encoded = serde_json::to_string(&obs).unwrap();
        let decoded: ObservationTempest = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, obs);
    }

    #[test]
    fn test_deserialize_impl_reports_positional_errors() {
        let err = serde_json::from_str::<ObservationTempest>(r#"{"obs":[[1]]}"#).unwrap_err();
        assert!(err.to_string().contains("expected 22"));
    }
}
