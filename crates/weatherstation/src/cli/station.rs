use argh::FromArgs;

use super::{CliError, Result};
use crate::api::{RestClient, TempestClient};
use crate::config::Config;

/// Query the Tempest REST API and print the result as JSON
#[derive(FromArgs)]
#[argh(subcommand, name = "station")]
pub struct StationCommand {
    /// print the latest observation of this device
    #[argh(option, short = 'd')]
    device: Option<i64>,

    /// print the latest observation of this station
    #[argh(option, short = 's')]
    station: Option<i64>,
}

impl StationCommand {
    pub async fn run(self, config: Config) -> Result<()> {
        if config.tempest.token.is_empty() {
            return Err(CliError::Missing(
                "an API token is required (tempest.token or WEATHERSTATION_TEMPEST_TOKEN)",
            ));
        }
        let client = RestClient::with_base_url(&config.api.base_url, &config.tempest.token)?;

        let output = self.fetch(&client).await?;
        println!("{}", output);
        Ok(())
    }

    async fn fetch(&self, client: &impl TempestClient) -> Result<String> {
        let json = match (self.device, self.station) {
            (Some(device_id), _) => {
                serde_json::to_string_pretty(&client.latest_device_observation(device_id).await?)?
            }
            (None, Some(station_id)) => serde_json::to_string_pretty(
                &client.latest_station_observation(station_id).await?,
            )?,
            (None, None) => serde_json::to_string_pretty(&client.station_metadata().await?)?,
        };
        Ok(json)
    }
}
