//! Terminal dashboard for live Tempest observations.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        self as crossterm_event, DisableMouseCapture, EnableMouseCapture, Event, KeyCode,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

pub mod app;
pub mod ui;

use crate::config::Config;
use crate::context::Context;
use crate::supervisor::Supervisor;
use crate::tempest::{EventType, ObservationTempest, Payload};
use app::{App, AppEvent};

/// Run the TUI until the user exits.
pub async fn run(config: Config) -> Result<()> {
    let (ctx, cancel) = Context::with_cancel();
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = tokio::spawn(listen(config.clone(), ctx, tx));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config.tempest.device_id, rx);
    let result = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    cancel.cancel();
    if let Err(e) = listener.await {
        log::warn!("Listener task failed: {}", e);
    }

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

/// Supervised listener feeding decoded observations and link status to the app.
async fn listen(config: Config, ctx: Context, tx: mpsc::UnboundedSender<AppEvent>) {
    let mut supervisor = Supervisor::new(config.tempest);

    let observations = tx.clone();
    supervisor.register_handler(
        EventType::ObservationTempest,
        move |_ctx: Context, payload: Payload| {
            let tx = observations.clone();
            async move {
                match ObservationTempest::decode(&payload) {
                    Ok(obs) => {
                        let _ = tx.send(AppEvent::Observation(Arc::new(obs)));
                    }
                    Err(e) => log::warn!("Dropping observation: {}", e),
                }
            }
        },
    );

    let sessions = tx.clone();
    supervisor.on_session_event(move |event| {
        let _ = sessions.send(AppEvent::Session(event));
    });

    if let Err(e) = supervisor.run(ctx).await {
        log::error!("Listener stopped: {}", e);
        let _ = tx.send(AppEvent::Fatal(e.to_string()));
    }
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        if crossterm_event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = crossterm_event::read()? {
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && (key.code == KeyCode::Char('c') || key.code == KeyCode::Char('x'))
                {
                    if app.handle_exit_request() {
                        break;
                    }
                    continue;
                }

                if app.handle_key(key) {
                    break;
                }
            }
        }

        app.tick();
        app.check_exit_timeout();

        // Let the listener task make progress between frames
        tokio::task::yield_now().await;
    }

    Ok(())
}
