//! CLI commands for the weatherstation binary

pub mod listen;
pub mod serve;
pub mod station;
pub mod tui;

pub use listen::ListenCommand;
pub use serve::ServeCommand;
pub use station::StationCommand;
pub use tui::TuiCommand;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::connection::ConnectionError;
use crate::context::{CancelHandle, Context};
use crate::server::ServerError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Listener stopped: {0}")]
    Connection(#[from] ConnectionError),

    #[error("REST API error: {0}")]
    Api(#[from] ApiError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Missing(&'static str),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Log to stderr, honoring `RUST_LOG`.
pub fn init_logging(default_filter: &str) {
    drop(
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
            .target(env_logger::Target::Stderr)
            .try_init(),
    );
}

/// Log to a file instead of the terminal.
pub fn init_file_logging(path: &Path, default_filter: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    drop(
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
            .target(env_logger::Target::Pipe(Box::new(log_file)))
            .try_init(),
    );
    Ok(())
}

/// Where the TUI writes its log.
pub fn tui_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("weatherstation")
        .join("tui.log")
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;

    log::info!("Shutdown signal received");
}

/// A context cancelled by the first shutdown signal.
pub(crate) fn signal_context() -> (Context, CancelHandle) {
    let (ctx, cancel) = Context::with_cancel();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        on_signal.cancel();
    });
    (ctx, cancel)
}
