use ratatui::{
    layout::{Alignment, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::config::ClockFormat;
use crate::prayer_times::ScheduleSnapshot;
use crate::source::FetchError;
use crate::tui::theme;
use crate::utils::format::format_time;

pub fn render(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&ScheduleSnapshot>,
    error: Option<&FetchError>,
    clock: ClockFormat,
) {
    let block = Block::default()
        .title(Span::styled(" Next Prayer ", theme::gold()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border())
        .style(theme::surface());

    let content: Vec<Line> = match (snapshot, error) {
        (Some(snap), _) => vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  Now   ", theme::dim()),
                Span::styled(snap.current_prayer.display_name(), theme::green()),
                Span::styled(
                    format!("  since {}", format_time(snap.current_prayer_time, clock)),
                    theme::dim(),
                ),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                format!("  {}", snap.next_prayer.display_name().to_uppercase()),
                theme::gold().add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled(
                    format!("  at {}  in  ", format_time(snap.next_prayer_time, clock)),
                    theme::dim(),
                ),
                Span::styled(
                    snap.time_remaining.to_string(),
                    theme::amber().add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("  Sahri ", theme::dim()),
                Span::styled(format_time(snap.sahri_time, clock), theme::bold()),
                Span::styled("   Iftar ", theme::dim()),
                Span::styled(format_time(snap.iftar_time, clock), theme::bold()),
            ]),
        ],
        (None, Some(err)) => vec![
            Line::from(""),
            Line::from(Span::styled(format!("  {}", err.user_message()), theme::red())),
            Line::from(""),
            Line::from(Span::styled("  [r] try again", theme::dim())),
        ],
        (None, None) => vec![
            Line::from(""),
            Line::from(Span::styled("  Loading prayer times…", theme::dim())),
        ],
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .alignment(Alignment::Left);

    frame.render_widget(paragraph, area);
}
