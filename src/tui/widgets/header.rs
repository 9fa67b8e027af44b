use chrono::NaiveDate;
use ratatui::{
    layout::{Alignment, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::models::CacheRecord;
use crate::tui::theme;

pub fn render(
    frame: &mut Frame,
    area: Rect,
    location: &str,
    record: Option<&CacheRecord>,
    today: NaiveDate,
) {
    let title_line = Line::from(vec![
        Span::styled("  وقت  ", theme::gold().add_modifier(Modifier::BOLD)),
        Span::styled("waqt", theme::gold()),
        Span::styled("  ·  ", theme::dim()),
        Span::styled(location, theme::dim()),
    ]);

    // Until the first fetch lands only the local date is known
    let date_line = match record {
        Some(record) => Line::from(vec![
            Span::styled(record.hijri_date.as_str(), theme::amber()),
            Span::styled("  ·  ", theme::dim()),
            Span::styled(record.gregorian_date.as_str(), theme::dim()),
        ]),
        None => Line::from(Span::styled(
            today.format("%A, %b %d, %Y").to_string(),
            theme::dim(),
        )),
    };

    let text = vec![title_line, Line::from(""), date_line];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::gold().add_modifier(Modifier::BOLD))
        .style(theme::base());

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}
