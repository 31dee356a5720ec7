use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Sparkline},
    Frame,
};

use super::components::{colors, flower_spinner, footer_line, header_line, temperature_color};
use crate::tempest::ObservationTempest;
use crate::tui::app::{App, LinkState};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    // header(1) + footer(1) + status(1) + hints(1)
    let main_height = area.height.saturating_sub(4).max(3);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(main_height),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    let subtitle = format!("v{} · device {}", VERSION, app.device_id);
    let header = header_line("Weatherstation", &subtitle, area.width as usize);
    f.render_widget(Paragraph::new(header), chunks[0]);

    let inner = render_side_borders(f, chunks[1]);
    match &app.latest {
        Some(obs) => render_observation(f, app, obs, inner),
        None => render_waiting(f, app, inner),
    }

    f.render_widget(Paragraph::new(footer_line(area.width as usize)), chunks[2]);

    render_status(f, app, chunks[4]);
    render_hints(f, app, chunks[5]);
}

fn render_side_borders(f: &mut Frame, area: Rect) -> Rect {
    let style = Style::default().fg(colors::PRIMARY);
    let border: String = "│\n".repeat(area.height as usize);

    f.render_widget(
        Paragraph::new(border.trim_end().to_string()).style(style),
        Rect::new(area.x, area.y, 1, area.height),
    );
    f.render_widget(
        Paragraph::new(border.trim_end().to_string()).style(style),
        Rect::new(
            area.x + area.width.saturating_sub(1),
            area.y,
            1,
            area.height,
        ),
    );

    Rect::new(
        area.x + 1,
        area.y,
        area.width.saturating_sub(2),
        area.height,
    )
}

fn render_waiting(f: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(vec![
            flower_spinner(app.spinner_frame),
            Span::styled(
                " Waiting for the first observation...",
                Style::default().fg(colors::TEXT),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            app.status.clone(),
            Style::default().fg(colors::DIMMED),
        )),
    ];
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(colors::BORDER))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default()
                .fg(colors::WARNING)
                .add_modifier(Modifier::BOLD),
        ))
}

fn row(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<12}", label), Style::default().fg(colors::DIMMED)),
        Span::styled(value, Style::default().fg(colors::TEXT)),
    ])
}

fn render_observation(f: &mut Frame, app: &App, obs: &ObservationTempest, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Min(3),
        ])
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(rows[1]);

    render_temperature(f, obs, top[0]);
    render_wind(f, obs, top[1]);
    render_air(f, obs, top[2]);
    render_conditions(f, obs, bottom[0]);
    render_lightning(f, obs, bottom[1]);
    render_solar(f, obs, bottom[2]);
    render_trend(f, app, rows[2]);
}

fn render_temperature(f: &mut Frame, obs: &ObservationTempest, area: Rect) {
    let temperature = obs.temperature_fahrenheit();
    let lines = vec![
        Line::from(Span::styled(
            format!("{:.1}°F", temperature),
            Style::default()
                .fg(temperature_color(temperature))
                .add_modifier(Modifier::BOLD),
        )),
        row("Feels like", format!("{:.1}°F", obs.feels_like_fahrenheit())),
        row("Wind chill", format!("{:.1}°F", obs.wind_chill_fahrenheit())),
        row("Dew point", format!("{:.1}°F", obs.dew_point_fahrenheit())),
    ];
    f.render_widget(Paragraph::new(lines).block(panel("Temperature")), area);
}

fn render_wind(f: &mut Frame, obs: &ObservationTempest, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            format!(
                "{:.1} mph {}",
                obs.wind_speed_average_mph(),
                obs.wind_direction()
            ),
            Style::default()
                .fg(colors::PRIMARY)
                .add_modifier(Modifier::BOLD),
        )),
        row("Gust", format!("{:.1} mph", obs.wind_speed_gust_mph())),
        row("Lull", format!("{:.1} mph", obs.wind_speed_lull_mph())),
        row(
            "Direction",
            format!("{:.0}°", obs.data.wind_direction_degrees),
        ),
    ];
    f.render_widget(Paragraph::new(lines).block(panel("Wind")), area);
}

fn render_air(f: &mut Frame, obs: &ObservationTempest, area: Rect) {
    let trend = if obs.summary.pressure_trend.is_empty() {
        "-".to_string()
    } else {
        obs.summary.pressure_trend.clone()
    };
    let lines = vec![
        Line::from(Span::styled(
            format!("{}% humidity", obs.data.relative_humidity),
            Style::default()
                .fg(colors::PRIMARY)
                .add_modifier(Modifier::BOLD),
        )),
        row("Pressure", format!("{:.1} mb", obs.data.station_pressure)),
        row("Trend", trend),
    ];
    f.render_widget(
        Paragraph::new(lines).block(panel("Humidity & Pressure")),
        area,
    );
}

fn render_conditions(f: &mut Frame, obs: &ObservationTempest, area: Rect) {
    let precipitation = obs.precipitation_type();
    let color = if obs.is_raining() {
        colors::COLD
    } else {
        colors::SUCCESS
    };
    let lines = vec![
        Line::from(Span::styled(
            precipitation.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        row("Last min", format!("{:.2} in", obs.rainfall_inches())),
        row("Today", format!("{:.2} in", obs.rainfall_today_inches())),
        row(
            "Yesterday",
            format!("{:.2} in", obs.rainfall_yesterday_inches()),
        ),
    ];
    f.render_widget(Paragraph::new(lines).block(panel("Conditions")), area);
}

fn render_lightning(f: &mut Frame, obs: &ObservationTempest, area: Rect) {
    let strikes = obs.data.lightning_strike_count;
    let headline = if strikes > 0 {
        Span::styled(
            format!(
                "{} strikes, {:.1} mi",
                strikes,
                obs.average_lightning_strike_distance_miles()
            ),
            Style::default()
                .fg(colors::WARNING)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("No strikes", Style::default().fg(colors::SUCCESS))
    };
    let lines = vec![
        Line::from(headline),
        row("Last hour", obs.summary.strike_count_1h.to_string()),
        row("Last 3h", obs.summary.strike_count_3h.to_string()),
        row(
            "Last dist",
            format!("{:.1} mi", obs.last_strike_distance_miles()),
        ),
    ];
    f.render_widget(Paragraph::new(lines).block(panel("Lightning")), area);
}

fn render_solar(f: &mut Frame, obs: &ObservationTempest, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            format!("UV {:.1}", obs.data.uv_index),
            Style::default()
                .fg(colors::WARNING)
                .add_modifier(Modifier::BOLD),
        )),
        row("Radiation", format!("{} W/m²", obs.data.solar_radiation)),
        row("Illuminance", format!("{} lux", obs.data.illuminance)),
        row("Battery", format!("{:.2} V", obs.data.battery_volts)),
    ];
    f.render_widget(Paragraph::new(lines).block(panel("Solar & UV")), area);
}

fn render_trend(f: &mut Frame, app: &App, area: Rect) {
    let title = match app.temperature_range() {
        Some((min, max)) => format!("Temperature trend {:.1}–{:.1}°F", min, max),
        None => "Temperature trend".to_string(),
    };
    let data = app.sparkline_data();
    let sparkline = Sparkline::default()
        .block(panel(&title))
        .data(&data)
        .style(Style::default().fg(colors::PRIMARY));
    f.render_widget(sparkline, area);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let (marker, color) = match app.link {
        LinkState::Connected => ("●", colors::SUCCESS),
        LinkState::Connecting => ("◌", colors::WARNING),
        LinkState::Disconnected => ("○", colors::WARNING),
        LinkState::Failed => ("✕", colors::ERROR),
    };

    let mut spans = vec![
        Span::styled(format!(" {} ", marker), Style::default().fg(color)),
        Span::styled(app.status.clone(), Style::default().fg(colors::TEXT)),
        Span::styled(
            format!("  {} observations", app.received),
            Style::default().fg(colors::DIMMED),
        ),
    ];
    if let Some(obs) = &app.latest {
        if let Some(at) = obs.observed_at() {
            spans.push(Span::styled(
                format!("  last {}", at.format("%H:%M:%S UTC")),
                Style::default().fg(colors::DIMMED),
            ));
        }
    }
    if let Some(error) = &app.last_error {
        spans.push(Span::styled(
            format!("  {}", error),
            Style::default().fg(colors::ERROR),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_hints(f: &mut Frame, app: &App, area: Rect) {
    let line = if app.exit_warning {
        Line::from(Span::styled(
            " Press Ctrl+C again to exit",
            Style::default().fg(colors::ERROR),
        ))
    } else {
        Line::from(Span::styled(
            " q/Esc quit · Ctrl+C twice to exit",
            Style::default().fg(colors::DIMMED),
        ))
    };
    f.render_widget(Paragraph::new(line), area);
}
