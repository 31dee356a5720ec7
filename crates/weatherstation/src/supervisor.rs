//! Keeps a listener session alive across connection failures.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::TempestConfig;
use crate::connection::{self, ConnectionError};
use crate::context::Context;
use crate::tempest::{EventListener, EventType, Handler};

pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Exponential reconnect delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial,
        }
    }

    /// The delay to wait now; doubles the following one up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF, MAX_BACKOFF)
    }
}

/// Progress of the supervised session, for status displays.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connecting { attempt: u32 },
    Connected { transport: &'static str },
    Disconnected { error: String, retry_in: Duration },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting { attempt } => write!(f, "connecting (attempt {})", attempt),
            Self::Connected { transport } => write!(f, "connected over {}", transport),
            Self::Disconnected { error, retry_in } => {
                write!(f, "disconnected: {} (retry in {}s)", error, retry_in.as_secs())
            }
        }
    }
}

type SessionCallback = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Dials, listens and redials with backoff until cancelled.
pub struct Supervisor {
    config: TempestConfig,
    handlers: Vec<(EventType, Arc<dyn Handler>)>,
    on_event: Option<SessionCallback>,
    backoff: Backoff,
}

impl Supervisor {
    pub fn new(config: TempestConfig) -> Self {
        Self {
            config,
            handlers: Vec::new(),
            on_event: None,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Register `handler` on every session's listener.
    pub fn register_handler(
        &mut self,
        event: EventType,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.handlers.push((event, Arc::new(handler)));
        self
    }

    pub fn on_session_event(
        &mut self,
        callback: impl Fn(SessionEvent) + Send + Sync + 'static,
    ) -> &mut Self {
        self.on_event = Some(Arc::new(callback));
        self
    }

    fn notify(&self, event: SessionEvent) {
        if let Some(callback) = &self.on_event {
            callback(event);
        }
    }

    /// Run sessions until `ctx` is cancelled.
    ///
    /// Returns `Ok` on cancellation. Only connection errors that no retry
    /// can fix are returned.
    pub async fn run(mut self, ctx: Context) -> Result<(), ConnectionError> {
        let mut attempt = 0u32;
        loop {
            if ctx.is_cancelled() {
                return Ok(());
            }
            attempt = attempt.saturating_add(1);
            self.notify(SessionEvent::Connecting { attempt });

            let error = match self.session(&ctx).await {
                SessionEnd::Cancelled => return Ok(()),
                SessionEnd::Fatal(e) => return Err(e),
                SessionEnd::Failed { error, lasted } => {
                    if lasted.is_some_and(|lasted| lasted > self.backoff.max()) {
                        self.backoff.reset();
                    }
                    error
                }
            };

            let retry_in = self.backoff.next_delay();
            log::warn!("Session ended: {}; reconnecting in {:?}", error, retry_in);
            self.notify(SessionEvent::Disconnected { error, retry_in });

            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                _ = tokio::time::sleep(retry_in) => {}
            }
        }
    }

    async fn session(&self, ctx: &Context) -> SessionEnd {
        let cfg = &self.config;
        let dial = connection::connect(&cfg.scheme, &cfg.host, &cfg.path, &cfg.token);
        let conn = tokio::select! {
            _ = ctx.cancelled() => return SessionEnd::Cancelled,
            conn = dial => conn,
        };
        let conn = match conn {
            Ok(conn) => conn.with_read_timeout(cfg.read_timeout()),
            Err(e) if e.is_permanent() => return SessionEnd::Fatal(e),
            Err(e) => {
                return SessionEnd::Failed {
                    error: e.to_string(),
                    lasted: None,
                }
            }
        };

        self.notify(SessionEvent::Connected {
            transport: conn.kind(),
        });
        let started = Instant::now();

        let mut listener = EventListener::new(conn, cfg.listen_group, cfg.device_id)
            .with_envelope_policy(cfg.envelope_policy());
        for (event, handler) in &self.handlers {
            listener.register_handlers(*event, [Arc::clone(handler)]);
        }

        match listener.listen(ctx.clone()).await {
            Err(e) if e.is_cancelled() => SessionEnd::Cancelled,
            Err(e) => SessionEnd::Failed {
                error: e.to_string(),
                lasted: Some(started.elapsed()),
            },
            Ok(()) => SessionEnd::Failed {
                error: "listener stopped".to_string(),
                lasted: Some(started.elapsed()),
            },
        }
    }
}

enum SessionEnd {
    Cancelled,
    Fatal(ConnectionError),
    Failed {
        error: String,
        lasted: Option<Duration>,
    },
}
