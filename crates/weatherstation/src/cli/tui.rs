use argh::FromArgs;

use crate::config::Config;

/// Show live observations in the terminal
#[derive(FromArgs)]
#[argh(subcommand, name = "tui")]
pub struct TuiCommand {}

impl TuiCommand {
    pub async fn run(self, config: Config) -> anyhow::Result<()> {
        crate::tui::run(config).await
    }
}
