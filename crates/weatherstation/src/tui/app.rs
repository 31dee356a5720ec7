use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc;

use super::ui::components::spinner_frames;
use crate::supervisor::SessionEvent;
use crate::tempest::ObservationTempest;

/// Samples kept for the temperature sparkline
pub const TREND_SAMPLES: usize = 120;

const SPINNER_INTERVAL: Duration = Duration::from_millis(150);
const EXIT_WARNING_TIMEOUT: Duration = Duration::from_secs(2);

/// Updates delivered from the background listener.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Observation(Arc<ObservationTempest>),
    Session(SessionEvent),
    /// The listener gave up
    Fatal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

pub struct App {
    pub device_id: i64,
    pub latest: Option<Arc<ObservationTempest>>,
    pub temperatures: VecDeque<f64>,
    pub received: u64,

    pub link: LinkState,
    pub status: String,
    pub last_error: Option<String>,

    /// Exit confirmation
    pub exit_warning: bool,
    pub exit_warning_time: Option<Instant>,

    pub spinner_frame: usize,
    last_spinner_update: Instant,

    events: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(device_id: i64, events: mpsc::UnboundedReceiver<AppEvent>) -> Self {
        Self {
            device_id,
            latest: None,
            temperatures: VecDeque::with_capacity(TREND_SAMPLES),
            received: 0,
            link: LinkState::Connecting,
            status: "starting".to_string(),
            last_error: None,
            exit_warning: false,
            exit_warning_time: None,
            spinner_frame: 0,
            last_spinner_update: Instant::now(),
            events,
        }
    }

    /// Returns true on the second request within the warning window.
    pub fn handle_exit_request(&mut self) -> bool {
        if self.exit_warning {
            true
        } else {
            self.exit_warning = true;
            self.exit_warning_time = Some(Instant::now());
            false
        }
    }

    pub fn check_exit_timeout(&mut self) {
        if let Some(time) = self.exit_warning_time {
            if time.elapsed() > EXIT_WARNING_TIMEOUT {
                self.exit_warning = false;
                self.exit_warning_time = None;
            }
        }
    }

    /// Returns true if the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
    }

    /// Drain pending listener updates and advance the spinner.
    pub fn tick(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }

        let now = Instant::now();
        if now.duration_since(self.last_spinner_update) > SPINNER_INTERVAL {
            self.spinner_frame = (self.spinner_frame + 1) % spinner_frames();
            self.last_spinner_update = now;
        }
    }

    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::Observation(obs) => {
                self.received += 1;
                if self.temperatures.len() == TREND_SAMPLES {
                    self.temperatures.pop_front();
                }
                self.temperatures.push_back(obs.temperature_fahrenheit());
                self.latest = Some(obs);
            }
            AppEvent::Session(event) => {
                self.link = match &event {
                    SessionEvent::Connecting { .. } => LinkState::Connecting,
                    SessionEvent::Connected { .. } => LinkState::Connected,
                    SessionEvent::Disconnected { error, .. } => {
                        self.last_error = Some(error.clone());
                        LinkState::Disconnected
                    }
                };
                self.status = event.to_string();
            }
            AppEvent::Fatal(error) => {
                self.link = LinkState::Failed;
                self.status = "listener stopped".to_string();
                self.last_error = Some(error);
            }
        }
    }

    /// Temperatures scaled for a sparkline: tenths of a degree above the minimum.
    pub fn sparkline_data(&self) -> Vec<u64> {
        let min = self
            .temperatures
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        self.temperatures
            .iter()
            .map(|t| ((t - min) * 10.0).round() as u64)
            .collect()
    }

    /// Lowest and highest temperature in the trend window.
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        if self.temperatures.is_empty() {
            return None;
        }
        let (min, max) = self
            .temperatures
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| {
                (lo.min(t), hi.max(t))
            });
        Some((min, max))
    }
}
