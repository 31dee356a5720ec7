//! Weatherstation - listen to a Tempest weather station and fan its
//! observations out to a live dashboard and a terminal UI.
//!
//! The core is the [`tempest::EventListener`]: it owns a
//! [`connection::Transport`], subscribes to a listen group, reads the event
//! stream and hands each raw message to the handlers registered for its
//! event type.
//!
//! ```rust,ignore
//! use weatherstation::connection;
//! use weatherstation::tempest::{EventListener, EventType, ListenGroup, ObservationTempest, Payload};
//! use weatherstation::Context;
//!
//! let conn = connection::connect("wss", "ws.weatherflow.com", "/swd/data", &token).await?;
//! let mut listener = EventListener::new(conn, ListenGroup::ListenStart, device_id);
//! listener.register_handler(EventType::ObservationTempest, |_ctx: Context, payload: Payload| async move {
//!     match ObservationTempest::decode(&payload) {
//!         Ok(obs) => log::info!("{:.1}°F", obs.temperature_fahrenheit()),
//!         Err(e) => log::warn!("Dropping observation: {}", e),
//!     }
//! });
//! listener.listen(Context::background()).await?;
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod connection;
pub mod context;
pub mod server;
pub mod supervisor;
pub mod tempest;
pub mod tui;

pub use context::{CancelHandle, Context};
