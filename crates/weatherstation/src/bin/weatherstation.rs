//! Weatherstation CLI
//!
//! Usage:
//!   weatherstation listen [-a]              # Log live events from the station
//!   weatherstation serve [-p port]          # Live dashboard on http://127.0.0.1:8080
//!   weatherstation tui                      # Live terminal dashboard
//!   weatherstation station                  # Station metadata from the REST API
//!   weatherstation station --device <id>    # Latest observation of a device
//!   weatherstation -c other.yaml serve      # Use another config file

use std::path::PathBuf;

use argh::FromArgs;
use weatherstation::cli::{self, ListenCommand, ServeCommand, StationCommand, TuiCommand};
use weatherstation::config::Config;

/// Weatherstation - live weather from a Tempest station
#[derive(FromArgs)]
struct Args {
    /// config file (default: ./config.yaml, then the user config directory)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// show version information
    #[argh(switch, short = 'V')]
    version: bool,

    #[argh(subcommand)]
    command: Option<Command>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Listen(ListenCommand),
    Serve(ServeCommand),
    Tui(TuiCommand),
    Station(StationCommand),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();

    if args.version {
        println!("weatherstation {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // The TUI owns the terminal, so its logs go to a file
    match &args.command {
        Some(Command::Tui(_)) => {
            let log_path = cli::tui_log_path();
            cli::init_file_logging(&log_path, "warn")
                .map_err(|e| format!("Failed to open log file {}: {}", log_path.display(), e))?;
        }
        Some(Command::Station(_)) => cli::init_logging("warn"),
        _ => cli::init_logging("info"),
    }

    let load_config = || {
        Config::load(args.config.as_deref()).map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    };

    match args.command {
        None => {
            eprintln!("Weatherstation - live weather from a Tempest station\n");
            eprintln!("Usage: weatherstation [-c config.yaml] <command>\n");
            eprintln!("Commands:");
            eprintln!("  listen    Log live events from the station");
            eprintln!("              -a, --all: log every event type");
            eprintln!("  serve     Run the listener and the live dashboard");
            eprintln!("              -p, --port <port>: HTTP port (default: 8080)");
            eprintln!("  tui       Live terminal dashboard");
            eprintln!("  station   Query the Tempest REST API:");
            eprintln!("              -d, --device <id>: latest device observation");
            eprintln!("              -s, --station <id>: latest station observation");
            eprintln!("\nRun 'weatherstation <command> --help' for more information.");
            return Ok(());
        }
        Some(Command::Listen(cmd)) => {
            cmd.run(load_config()?)
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)?;
        }
        Some(Command::Serve(cmd)) => {
            cmd.run(load_config()?)
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)?;
        }
        Some(Command::Tui(cmd)) => {
            cmd.run(load_config()?).await?;
        }
        Some(Command::Station(cmd)) => {
            cmd.run(load_config()?)
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)?;
        }
    }

    Ok(())
}
