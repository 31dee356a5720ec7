use ratatui::{
    style::Style,
    text::{Line, Span},
};

/// Color palette shared with the web dashboard
pub mod colors {
    use ratatui::style::Color;

    pub const PRIMARY: Color = Color::Rgb(78, 205, 196); // #4ECDC4
    pub const SUCCESS: Color = Color::Rgb(149, 225, 211); // #95E1D3
    pub const WARNING: Color = Color::Rgb(255, 217, 61); // #FFD93D
    pub const ERROR: Color = Color::Rgb(255, 107, 107); // #FF6B6B
    pub const DIMMED: Color = Color::Rgb(136, 136, 136); // #888
    pub const TEXT: Color = Color::Rgb(204, 204, 204); // #CCC
    pub const BORDER: Color = Color::Rgb(68, 68, 68); // #444
    pub const COLD: Color = Color::Rgb(116, 185, 255); // #74B9FF
}

const FLOWER_FRAMES: &[char] = &['✻', '✼', '✽', '✾', '✿', '❀', '❁'];

pub fn spinner_frames() -> usize {
    FLOWER_FRAMES.len()
}

pub fn flower_spinner(frame: usize) -> Span<'static> {
    let ch = FLOWER_FRAMES[frame % FLOWER_FRAMES.len()];
    Span::styled(ch.to_string(), Style::default().fg(colors::WARNING))
}

/// `╭─── title subtitle ────╮` spanning `width` columns
pub fn header_line(title: &str, subtitle: &str, width: usize) -> Line<'static> {
    let title_part = format!("─── {} ", title);
    let subtitle_part = format!("{} ", subtitle);
    let used = title_part.chars().count() + subtitle_part.chars().count() + 2;

    Line::from(vec![
        Span::styled("╭", Style::default().fg(colors::PRIMARY)),
        Span::styled(title_part, Style::default().fg(colors::PRIMARY)),
        Span::styled(subtitle_part, Style::default().fg(colors::DIMMED)),
        Span::styled(
            "─".repeat(width.saturating_sub(used)),
            Style::default().fg(colors::PRIMARY),
        ),
        Span::styled("╮", Style::default().fg(colors::PRIMARY)),
    ])
}

pub fn footer_line(width: usize) -> Line<'static> {
    let style = Style::default().fg(colors::PRIMARY);
    Line::from(vec![
        Span::styled("╰", style),
        Span::styled("─".repeat(width.saturating_sub(2)), style),
        Span::styled("╯", style),
    ])
}

/// Color for a temperature in °F.
pub fn temperature_color(fahrenheit: f64) -> ratatui::style::Color {
    match fahrenheit {
        t if t <= 32.0 => colors::COLD,
        t if t >= 90.0 => colors::ERROR,
        t if t >= 80.0 => colors::WARNING,
        _ => colors::TEXT,
    }
}
