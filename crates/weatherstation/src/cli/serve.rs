use std::sync::Arc;

use argh::FromArgs;

use super::{signal_context, Result};
use crate::api::RestClient;
use crate::config::Config;
use crate::server::{self, DashboardState};
use crate::supervisor::Supervisor;
use crate::tempest::EventType;

/// Run the listener and serve the live dashboard
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
pub struct ServeCommand {
    /// HTTP port (default: from config, 8080)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// address to bind (default: from config, 127.0.0.1)
    #[argh(option, short = 'b')]
    bind: Option<String>,
}

impl ServeCommand {
    pub async fn run(self, config: Config) -> Result<()> {
        let port = self.port.unwrap_or(config.server.port);
        let bind = self.bind.unwrap_or_else(|| config.server.bind.clone());
        let addr = format!("{}:{}", bind, port);

        let (ctx, cancel) = signal_context();
        let state = Arc::new(DashboardState::new(
            config.server.history_size,
            ctx.clone(),
        ));

        // Runs alongside the listener; a live observation newer than the
        // seed wins in `DashboardState::publish`
        if config.api.seed_on_start {
            let state = Arc::clone(&state);
            let config = config.clone();
            tokio::spawn(async move { seed(&state, &config).await });
        }

        let mut supervisor = Supervisor::new(config.tempest.clone());
        supervisor.register_handler(
            EventType::ObservationTempest,
            server::observation_handler(Arc::clone(&state)),
        );

        let listener = {
            let ctx = ctx.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let result = supervisor.run(ctx).await;
                // Nothing left to serve once the listener gives up
                if result.is_err() {
                    cancel.cancel();
                }
                result
            })
        };

        let shutdown = {
            let ctx = ctx.clone();
            async move { ctx.cancelled().await }
        };
        let served = server::serve(&addr, state, shutdown).await;

        cancel.cancel();
        match listener.await {
            Ok(Err(e)) => return Err(e.into()),
            Err(e) => log::error!("Listener task failed: {}", e),
            Ok(Ok(())) => {}
        }
        served?;
        Ok(())
    }
}

/// Show the latest REST observation until the first live one arrives.
async fn seed(state: &DashboardState, config: &Config) {
    let tempest = &config.tempest;
    if tempest.token.is_empty() || tempest.device_id == 0 {
        log::debug!("Skipping REST seed: token or device id not configured");
        return;
    }

    let client = match RestClient::with_base_url(&config.api.base_url, &tempest.token) {
        Ok(client) => client,
        Err(e) => {
            log::warn!("Skipping REST seed: {}", e);
            return;
        }
    };
    match state.seed(&client, tempest.device_id).await {
        Ok(()) => log::info!("Seeded dashboard from the REST API"),
        Err(e) => log::warn!("Failed to seed dashboard: {}", e),
    }
}
