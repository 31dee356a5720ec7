//! Live weather dashboard over HTTP.
//!
//! Routes:
//! - `GET /events` Server-Sent-Events stream of `observation` events
//! - `GET /api/observation` latest observation, 204 before the first one
//! - `GET /api/history` recent samples for charting
//! - `GET /health`
//! - everything else: the embedded dashboard page

mod broadcaster;
mod history;
mod view;

pub use broadcaster::{Broadcaster, SUBSCRIBER_BUFFER};
pub use history::History;
pub use view::{HistoryPoint, ObservationView};

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use rust_embed::RustEmbed;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};

use crate::api::{ApiError, TempestClient};
use crate::context::Context;
use crate::tempest::{Handler, ObservationTempest, Payload};

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

/// SSE event name carrying an [`ObservationView`].
pub const OBSERVATION_EVENT: &str = "observation";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// State shared by the listener handler and the HTTP routes.
pub struct DashboardState {
    latest: RwLock<Option<Arc<ObservationTempest>>>,
    history: Mutex<History>,
    updates: Broadcaster<Arc<ObservationView>>,
    shutdown: Context,
}

impl DashboardState {
    /// `shutdown` ends open event streams when cancelled.
    pub fn new(history_size: usize, shutdown: Context) -> Self {
        Self {
            latest: RwLock::new(None),
            history: Mutex::new(History::new(history_size)),
            updates: Broadcaster::default(),
            shutdown,
        }
    }

    /// Make `obs` the latest observation and push it to subscribers.
    ///
    /// Observations older than the current latest one are dropped, so
    /// handlers finishing out of order never move the dashboard back in time.
    pub async fn publish(&self, obs: ObservationTempest) {
        let mut latest = self.latest.write().await;
        if let Some(current) = latest.as_ref() {
            if obs.data.time_epoch < current.data.time_epoch {
                log::debug!(
                    "Dropping stale observation from {} (latest is {})",
                    obs.data.time_epoch,
                    current.data.time_epoch
                );
                return;
            }
        }

        let view = Arc::new(ObservationView::from(&obs));
        self.history.lock().await.push(HistoryPoint::from(&obs));
        *latest = Some(Arc::new(obs));

        // Broadcast under the lock so subscribers see publishes in order
        let delivered = self.updates.broadcast(view).await;
        log::debug!("Observation published to {} subscriber(s)", delivered);
    }

    pub async fn latest(&self) -> Option<Arc<ObservationTempest>> {
        self.latest.read().await.clone()
    }

    pub async fn history(&self) -> Vec<HistoryPoint> {
        self.history.lock().await.points()
    }

    pub async fn subscribe(&self) -> tokio::sync::mpsc::Receiver<Arc<ObservationView>> {
        self.updates.subscribe().await
    }

    /// Publish the device's latest observation from the REST API.
    ///
    /// Gives up without error once the shutdown context is cancelled. A live
    /// observation that is newer than the REST one wins.
    pub async fn seed(&self, client: &impl TempestClient, device_id: i64) -> Result<(), ApiError> {
        let obs = tokio::select! {
            _ = self.shutdown.cancelled() => {
                log::debug!("Seed abandoned: shutting down");
                return Ok(());
            }
            obs = client.latest_device_observation(device_id) => obs?,
        };
        log::info!("Seeded dashboard with observation from {}", obs.data.time_epoch);
        self.publish(obs).await;
        Ok(())
    }
}

/// `obs_st` handler that decodes each message and publishes it to `state`.
pub fn observation_handler(state: Arc<DashboardState>) -> impl Handler {
    move |_ctx: Context, payload: Payload| {
        let state = Arc::clone(&state);
        async move {
            match ObservationTempest::decode(&payload) {
                Ok(obs) => state.publish(obs).await,
                Err(e) => log::warn!("Dropping obs_st message: {}", e),
            }
        }
    }
}

pub fn router(state: Arc<DashboardState>) -> Router {
    Router::new()
        .route("/events", get(events))
        .route("/api/observation", get(latest_observation))
        .route("/api/history", get(history))
        .route("/health", get(health))
        .fallback(static_handler)
        .with_state(state)
}

/// Bind `addr` and serve the dashboard until `shutdown` resolves.
pub async fn serve(
    addr: &str,
    state: Arc<DashboardState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    serve_on(listener, state, shutdown).await
}

/// Serve the dashboard on an already bound listener.
pub async fn serve_on(
    listener: TcpListener,
    state: Arc<DashboardState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    log::info!("Dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    log::info!("Dashboard shut down gracefully");
    Ok(())
}

async fn events(
    State(state): State<Arc<DashboardState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe().await;
    let current = state
        .latest()
        .await
        .map(|obs| Arc::new(ObservationView::from(obs.as_ref())));

    let updates = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|view| (view, rx))
    });
    let shutdown = state.shutdown.clone();
    let stream = futures::stream::iter(current)
        .chain(updates)
        .map(|view| Ok(observation_event(&view)))
        .take_until(async move { shutdown.cancelled().await });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn observation_event(view: &ObservationView) -> Event {
    Event::default()
        .event(OBSERVATION_EVENT)
        .json_data(view)
        .unwrap_or_else(|e| {
            log::error!("Failed to encode observation event: {}", e);
            Event::default().comment("encode error")
        })
}

async fn latest_observation(State(state): State<Arc<DashboardState>>) -> Response {
    match state.latest().await {
        Some(obs) => Json(ObservationView::from(obs.as_ref())).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn history(State(state): State<Arc<DashboardState>>) -> Json<Vec<HistoryPoint>> {
    Json(state.history().await)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

fn asset(path: &str) -> Option<Response> {
    let file = Assets::get(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Some(
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime.as_ref().to_string())],
            file.data.into_owned(),
        )
            .into_response(),
    )
}

/// Embedded dashboard files; unknown paths get the page itself.
async fn static_handler(uri: Uri) -> Response {
    let path = match uri.path().trim_start_matches('/') {
        "" => "index.html",
        path => path,
    };
    asset(path)
        .or_else(|| asset("index.html"))
        .unwrap_or_else(|| StatusCode::NOT_FOUND.into_response())
}
