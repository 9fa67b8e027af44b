use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::tui::theme;

pub fn render(frame: &mut Frame, area: Rect, status: Option<&str>, refreshing: bool) {
    let hints = [("[r]", " refresh  "), ("[?]", " help  "), ("[q]", " quit")];

    let mut spans = Vec::new();
    if refreshing {
        spans.push(Span::styled("↻ refreshing  ", theme::amber()));
    } else if let Some(status) = status {
        spans.push(Span::styled(format!("{}  ", status), theme::dim()));
    }
    for (key, label) in &hints {
        spans.push(Span::styled(*key, theme::gold()));
        spans.push(Span::styled(*label, theme::dim()));
    }

    let line = Line::from(spans);
    let paragraph = Paragraph::new(line).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}
