use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem},
    Frame,
};

use crate::config::ClockFormat;
use crate::prayer_times::schedule::ScheduleRow;
use crate::tui::theme;
use crate::utils::format::format_range;

pub fn render(frame: &mut Frame, area: Rect, rows: &[ScheduleRow], clock: ClockFormat) {
    let block = Block::default()
        .title(Span::styled(" Farz Prayers ", theme::gold()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border())
        .style(theme::surface());

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let (icon, name_style) = if row.is_current {
                ("●", theme::gold().add_modifier(Modifier::BOLD))
            } else {
                ("○", theme::bold())
            };

            let line = Line::from(vec![
                Span::styled(format!("  {} ", icon), if row.is_current { theme::green() } else { theme::dim() }),
                Span::styled(format!("{:<9}", row.prayer.display_name()), name_style),
                Span::styled(format_range(row.start, row.end, clock), theme::dim()),
            ]);

            ListItem::new(line)
        })
        .collect();

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}
