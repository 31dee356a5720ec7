pub(crate) mod components;
mod dashboard;

use ratatui::Frame;

use crate::tui::app::App;

pub fn render(f: &mut Frame, app: &App) {
    dashboard::render(f, app);
}
