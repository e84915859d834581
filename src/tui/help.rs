use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key(k: &'static str, pad: &'static str, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(k, Style::default().fg(Color::Magenta)),
        Span::raw(pad),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key("o", "           ", "Open a photo (type a path, Enter to analyze)"),
        key("Esc", "         ", "Leave the path input"),
        key("r", "           ", "Analyze another photo (reset)"),
        key("x", "           ", "Abandon the running analysis"),
        key("y", "           ", "Copy the result as JSON"),
        key("tab", "         ", "Switch tabs"),
        key("?", "           ", "Show this help"),
        Line::from(""),
        Line::from("Accepted files:"),
        Line::from("  Any image type (JPG, PNG, GIF, WebP, ...) up to the upload limit."),
        Line::from("  Analysis runs one photo at a time; new photos are ignored while it runs."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
