use chrono::NaiveTime;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::config::ClockFormat;
use crate::tui::theme;
use crate::utils::format::format_time;

pub fn render(frame: &mut Frame, area: Rect, times: &[(&str, NaiveTime)], clock: ClockFormat) {
    let block = Block::default()
        .title(Span::styled(" Other Times ", theme::gold()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border())
        .style(theme::surface());

    let lines: Vec<Line> = times
        .iter()
        .map(|(label, time)| {
            Line::from(vec![
                Span::styled(format!("  {:<19}", label), theme::dim()),
                Span::styled(format_time(*time, clock), theme::bold()),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
