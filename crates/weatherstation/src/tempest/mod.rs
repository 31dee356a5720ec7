//! Tempest event protocol: subscription, dispatch and message decoding.

pub mod envelope;
pub mod events;
pub mod handler;
pub mod listener;
pub mod observation;
pub mod units;

pub use envelope::Envelope;
pub use events::{EventType, ListenGroup};
pub use handler::{Handler, Payload};
pub use listener::{EnvelopePolicy, EventListener, ListenError, SubscriptionRequest};
pub use observation::{
    DecodeError, ObservationTempest, ObservationTempestData, ObservationTempestSummary, Status,
    OBSERVATION_FIELDS,
};
pub use units::PrecipitationType;

#[cfg(test)]
pub(crate) mod fixtures {
    /// A complete `obs_st` message as sent by the websocket gateway.
    pub const OBS_ST: &str = r#"{
        "status": {"status_code": 0, "status_message": "SUCCESS"},
        "device_id": 12345,
        "type": "obs_st",
        "source": "cache",
        "summary": {
            "pressure_trend": "falling",
            "strike_count_1h": 2,
            "strike_count_3h": 5,
            "precip_total_1h": 0.5,
            "strike_last_dist": 12,
            "strike_last_epoch": 1700000000,
            "precip_accum_local_yesterday": 3.2,
            "precip_accum_local_yesterday_final": 3.4,
            "feels_like": 21.5,
            "heat_index": 21.5,
            "wind_chill": 21.5,
            "dew_point": 12.1,
            "wet_bulb_temperature": 15.8,
            "air_density": 1.18,
            "delta_t": 5.2,
            "precip_minutes_local_day": 10,
            "precip_minutes_local_yesterday": 45
        },
        "obs": [[1700000060, 0.3, 1.2, 2.5, 182, 3, 1012.4, 21.5, 55, 12000, 2.1, 150, 0.25, 1, 8.0, 2, 2.61, 1, 1.5, 0, 0, 1]]
    }"#;

    pub const OBS_AIR: &str = r#"{"type":"obs_air","device_id":1,"obs":[[1700000060,1012.4,21.5,55,0,0,3.4,1]]}"#;

    pub const CONNECTION_OPENED: &str = r#"{"type":"connection_opened"}"#;
}
