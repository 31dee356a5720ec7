use argh::FromArgs;

use super::{signal_context, Result};
use crate::config::Config;
use crate::context::Context;
use crate::supervisor::Supervisor;
use crate::tempest::{Envelope, EventType, ObservationTempest, Payload};

/// Listen to the station and log its events
#[derive(FromArgs)]
#[argh(subcommand, name = "listen")]
pub struct ListenCommand {
    /// log every event type, not only observations
    #[argh(switch, short = 'a')]
    all: bool,
}

impl ListenCommand {
    pub async fn run(self, config: Config) -> Result<()> {
        log::info!(
            "Listening to device {} via {}://{}{}",
            config.tempest.device_id,
            config.tempest.scheme,
            config.tempest.host,
            config.tempest.path
        );

        let mut supervisor = Supervisor::new(config.tempest);
        supervisor.register_handler(EventType::ConnectionOpened, log_connection_opened);
        supervisor.register_handler(EventType::ObservationTempest, log_observation);
        if self.all {
            for event in EventType::ALL {
                if !matches!(
                    event,
                    EventType::ConnectionOpened | EventType::ObservationTempest
                ) {
                    supervisor.register_handler(event, log_event);
                }
            }
        }

        let (ctx, _cancel) = signal_context();
        supervisor.run(ctx).await?;
        Ok(())
    }
}

async fn log_connection_opened(_ctx: Context, _payload: Payload) {
    log::info!("Connection opened");
}

async fn log_observation(_ctx: Context, payload: Payload) {
    let obs = match ObservationTempest::decode(&payload) {
        Ok(obs) => obs,
        Err(e) => {
            log::warn!("Dropping obs_st message: {}", e);
            return;
        }
    };

    let at = obs
        .observed_at()
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| obs.data.time_epoch.to_string());
    log::info!(
        "{} device {}: {:.1}°F, {}% humidity, wind {:.1} mph {} (gust {:.1}), {:.1} mb, {}",
        at,
        obs.device_id,
        obs.temperature_fahrenheit(),
        obs.data.relative_humidity,
        obs.wind_speed_average_mph(),
        obs.wind_direction(),
        obs.wind_speed_gust_mph(),
        obs.data.station_pressure,
        obs.precipitation_type()
    );
}

async fn log_event(_ctx: Context, payload: Payload) {
    match Envelope::decode(&payload) {
        Ok(envelope) => log::info!(
            "{} event (device {:?}, station {:?})",
            envelope.event_type,
            envelope.device_id,
            envelope.station_id
        ),
        Err(e) => log::debug!("Unreadable event: {}", e),
    }
}
