use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subscription category requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenGroup {
    #[default]
    ListenStart,
    ListenStop,
    ListenStartEvents,
    ListenStopEvents,
    ListenRapidStart,
    ListenRapidStop,
}

impl ListenGroup {
    pub const ALL: [ListenGroup; 6] = [
        Self::ListenStart,
        Self::ListenStop,
        Self::ListenStartEvents,
        Self::ListenStopEvents,
        Self::ListenRapidStart,
        Self::ListenRapidStop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListenStart => "listen_start",
            Self::ListenStop => "listen_stop",
            Self::ListenStartEvents => "listen_start_events",
            Self::ListenStopEvents => "listen_stop_events",
            Self::ListenRapidStart => "listen_rapid_start",
            Self::ListenRapidStop => "listen_rapid_stop",
        }
    }
}

impl fmt::Display for ListenGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListenGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|group| group.as_str() == s)
            .ok_or_else(|| format!("unknown listen group: {}", s))
    }
}

/// Discriminator values of inbound device messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "ack")]
    Ack,
    #[serde(rename = "connection_opened")]
    ConnectionOpened,
    #[serde(rename = "evt_precip")]
    RainStart,
    #[serde(rename = "evt_strike")]
    LightningStrike,
    #[serde(rename = "evt_device_online")]
    DeviceOnline,
    #[serde(rename = "evt_device_offline")]
    DeviceOffline,
    #[serde(rename = "evt_station_online")]
    StationOnline,
    #[serde(rename = "evt_station_offline")]
    StationOffline,
    #[serde(rename = "rapid_wind")]
    RapidWind,
    #[serde(rename = "obs_air")]
    ObservationAir,
    #[serde(rename = "obs_sky")]
    ObservationSky,
    #[serde(rename = "obs_st")]
    ObservationTempest,
}

impl EventType {
    pub const ALL: [EventType; 12] = [
        Self::Ack,
        Self::ConnectionOpened,
        Self::RainStart,
        Self::LightningStrike,
        Self::DeviceOnline,
        Self::DeviceOffline,
        Self::StationOnline,
        Self::StationOffline,
        Self::RapidWind,
        Self::ObservationAir,
        Self::ObservationSky,
        Self::ObservationTempest,
    ];

    /// Wire name of the event, as found in the envelope `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::ConnectionOpened => "connection_opened",
            Self::RainStart => "evt_precip",
            Self::LightningStrike => "evt_strike",
            Self::DeviceOnline => "evt_device_online",
            Self::DeviceOffline => "evt_device_offline",
            Self::StationOnline => "evt_station_online",
            Self::StationOffline => "evt_station_offline",
            Self::RapidWind => "rapid_wind",
            Self::ObservationAir => "obs_air",
            Self::ObservationSky => "obs_sky",
            Self::ObservationTempest => "obs_st",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("unknown event type: {}", s))
    }
}
