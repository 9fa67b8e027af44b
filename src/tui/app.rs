use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use log::{info, warn};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    DefaultTerminal, Frame,
};
use std::sync::mpsc::Sender;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::cache::{ScheduleSource, TimingsCache};
use crate::config::AppConfig;
use crate::models::CacheRecord;
use crate::prayer_times::{
    Clock, ScheduleSnapshot, ScheduleTicker, SharedTimings, compute_schedule, day_table,
    other_times,
};
use crate::source::FetchError;
use crate::tui::events::{Event, EventHandler};
use crate::tui::theme;
use crate::tui::widgets::{header, next_prayer, other_times as other_times_widget, prayers, statusbar};
use crate::utils::format::format_age_secs;

/// Minimum gap between automatic refresh attempts.
const REFRESH_RETRY: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Dashboard,
    Help,
}

pub struct App {
    pub view: View,
    pub should_quit: bool,
    config: AppConfig,
    cache: Arc<TimingsCache>,
    clock: Arc<dyn Clock>,
    events: Sender<Event>,

    // Refresh state
    source: ScheduleSource,
    last_attempt: Instant,

    // What is on screen
    record: Option<CacheRecord>,
    snapshot: Option<ScheduleSnapshot>,
    error: Option<FetchError>,

    // Started once the first record is known
    timings: Option<SharedTimings>,
    ticker: Option<ScheduleTicker>,
}

impl App {
    pub fn new(
        config: AppConfig,
        cache: Arc<TimingsCache>,
        clock: Arc<dyn Clock>,
        events: Sender<Event>,
    ) -> Self {
        let source = cache.load_or_refresh();
        let cached = source.cached().cloned();

        let mut app = App {
            view: View::Dashboard,
            should_quit: false,
            config,
            cache,
            clock,
            events,
            source,
            last_attempt: Instant::now(),
            record: None,
            snapshot: None,
            error: None,
            timings: None,
            ticker: None,
        };

        if let Some(record) = cached {
            app.apply_record(record);
        }
        app
    }

    fn apply_record(&mut self, record: CacheRecord) {
        let now = self.clock.now().naive_local();
        self.snapshot = Some(compute_schedule(&record.timings, now));

        match &self.timings {
            Some(shared) => match shared.write() {
                Ok(mut timings) => *timings = record.timings,
                Err(_) => warn!("Shared timings poisoned, countdown may be stale"),
            },
            None => {
                let shared: SharedTimings = Arc::new(RwLock::new(record.timings));
                let interval = Duration::from_secs(self.config.display.refresh_interval_secs.max(1));
                let tx = self.events.clone();
                self.ticker = Some(ScheduleTicker::start(
                    Arc::clone(&shared),
                    Arc::clone(&self.clock),
                    interval,
                    move |snapshot| tx.send(Event::Schedule(snapshot)).is_ok(),
                ));
                self.timings = Some(shared);
            }
        }

        self.error = None;
        self.record = Some(record);
    }

    fn start_refresh(&mut self, force: bool) {
        self.last_attempt = Instant::now();
        self.source = if force {
            self.cache.force_refresh()
        } else {
            self.cache.load_or_refresh()
        };

        // Another process may have refreshed the store in the meantime
        if let Some(cached) = self.source.cached() {
            if self.record.as_ref() != Some(cached) {
                let cached = cached.clone();
                self.apply_record(cached);
            }
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Tick => self.tick(),
            Event::Schedule(snapshot) => self.snapshot = Some(snapshot),
        }
    }

    pub fn tick(&mut self) {
        if let Some(update) = self.source.try_update() {
            match update {
                Ok(record) => {
                    info!("Dashboard picked up timings for {}", record.gregorian_date);
                    self.apply_record(record);
                }
                Err(e) => {
                    warn!("No prayer times to show: {}", e);
                    self.error = Some(e);
                }
            }
        }

        if self.source.is_refreshing() || self.last_attempt.elapsed() < REFRESH_RETRY {
            return;
        }
        let due = match &self.record {
            Some(record) => self.cache.is_stale(record),
            None => true,
        };
        if due {
            self.start_refresh(false);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        // Only handle actual key presses; some terminals also report release/repeat
        if key.kind != KeyEventKind::Press {
            return;
        }
        match self.view {
            View::Dashboard => self.handle_dashboard_key(key),
            View::Help => self.handle_help_key(key),
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Char('?') => {
                self.view = View::Help;
            }
            KeyCode::Char('r') => {
                if !self.source.is_refreshing() {
                    self.start_refresh(true);
                }
            }
            _ => {}
        }
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('?') => {
                self.view = View::Dashboard;
            }
            _ => {}
        }
    }

    /// Stop the ticker. The app keeps its last state.
    pub fn shutdown(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        self.draw_dashboard(frame);
        if self.view == View::Help {
            self.draw_help_overlay(frame);
        }
    }

    fn status_text(&self) -> Option<String> {
        let record = self.record.as_ref()?;
        let age = record.age(self.clock.now().to_utc()).num_seconds();
        Some(format!("Updated {}", format_age_secs(age)))
    }

    fn draw_dashboard(&self, frame: &mut Frame) {
        let area = frame.area();
        let clock = self.config.display.clock_format;

        frame.render_widget(Block::default().style(theme::base()), area);

        let outer_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // header
                Constraint::Min(0),    // body
                Constraint::Length(1), // status bar
            ])
            .split(area);

        header::render(
            frame,
            outer_chunks[0],
            &self.config.location.name,
            self.record.as_ref(),
            self.clock.now().date_naive(),
        );

        let status = self.status_text();
        statusbar::render(
            frame,
            outer_chunks[2],
            status.as_deref(),
            self.source.is_refreshing(),
        );

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(outer_chunks[1]);

        let left_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(7), // farz table
                Constraint::Length(6), // other times
                Constraint::Min(0),
            ])
            .split(columns[0]);

        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(10), Constraint::Min(0)])
            .split(columns[1]);

        next_prayer::render(
            frame,
            right_chunks[0],
            self.snapshot.as_ref(),
            self.error.as_ref(),
            clock,
        );

        if let Some(record) = &self.record {
            let now = self.clock.now().naive_local();
            let rows = day_table(&record.timings, now);
            prayers::render(frame, left_chunks[0], &rows, clock);
            other_times_widget::render(frame, left_chunks[1], &other_times(&record.timings), clock);
        }
    }

    fn draw_help_overlay(&self, frame: &mut Frame) {
        let area = frame.area();

        let popup_area = Rect {
            x: area.width / 4,
            y: area.height / 4,
            width: area.width / 2,
            height: (area.height / 2).min(10),
        };

        frame.render_widget(Clear, popup_area);

        let help_text = vec![
            Line::from(Span::styled(
                "  Keybindings",
                theme::gold().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("  [r]        ", theme::gold()),
                Span::styled("Fetch today's timings again", theme::dim()),
            ]),
            Line::from(vec![
                Span::styled("  [?]        ", theme::gold()),
                Span::styled("Toggle help", theme::dim()),
            ]),
            Line::from(vec![
                Span::styled("  [q] / Esc  ", theme::gold()),
                Span::styled("Quit", theme::dim()),
            ]),
        ];

        let block = Block::default()
            .title(Span::styled(" Help ", theme::gold()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::gold())
            .style(theme::surface());

        let paragraph = Paragraph::new(help_text).block(block);
        frame.render_widget(paragraph, popup_area);
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn event_loop(terminal: &mut DefaultTerminal, app: &mut App, events: &EventHandler) -> Result<()> {
    loop {
        terminal.draw(|frame| app.draw(frame))?;
        app.handle_event(events.next()?);
        if app.should_quit {
            return Ok(());
        }
    }
}

/// Run the TUI event loop.
pub fn run(cache: Arc<TimingsCache>, clock: Arc<dyn Clock>, config: AppConfig) -> Result<()> {
    let events = EventHandler::new(500);
    let mut app = App::new(config, cache, clock, events.sender());

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut app, &events);
    app.shutdown();
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachePolicy;
    use crate::db::MemoryStore;
    use crate::models::{DailyTimings, Prayer, PrayerTimeSet};
    use crate::prayer_times::clock::FixedClock;
    use crate::source::TimingsSource;
    use crossterm::event::KeyModifiers;
    use std::sync::mpsc;

    struct StubSource(Result<DailyTimings, FetchError>);

    impl TimingsSource for StubSource {
        fn fetch_timings(&self) -> Result<DailyTimings, FetchError> {
            self.0.clone()
        }
    }

    fn day() -> DailyTimings {
        DailyTimings {
            hijri_date: "14 Ramaḍān 1446".to_string(),
            gregorian_date: "14 March 2025".to_string(),
            timings: PrayerTimeSet::sample(),
        }
    }

    fn app_with(
        source: StubSource,
        seeded: bool,
    ) -> (App, mpsc::Receiver<Event>) {
        let clock = Arc::new(FixedClock::at(13, 0));
        let cache = Arc::new(TimingsCache::new(
            Arc::new(MemoryStore::default()),
            Arc::new(source),
            clock.clone(),
            CachePolicy::FixedTtl(chrono::Duration::hours(12)),
        ));
        if seeded {
            cache
                .store(&CacheRecord::new(day(), clock.now().to_utc()))
                .unwrap();
        }
        let (tx, rx) = mpsc::channel();
        (App::new(AppConfig::default(), cache, clock, tx), rx)
    }

    fn settle(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while app.source.is_refreshing() {
            assert!(Instant::now() < deadline, "refresh never settled");
            std::thread::sleep(Duration::from_millis(5));
            app.tick();
        }
    }

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn fresh_cache_shows_a_schedule_immediately() {
        let (app, rx) = app_with(StubSource(Err(FetchError::PermissionDenied)), true);
        assert!(!app.source.is_refreshing());
        let snap = app.snapshot.unwrap();
        assert_eq!(snap.current_prayer, Prayer::Dhuhr);
        assert_eq!(snap.next_prayer, Prayer::Asr);
        assert!(app.error.is_none());

        // The ticker pushes its first snapshot right away
        match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
            Event::Schedule(pushed) => assert_eq!(pushed, snap),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn empty_cache_fills_in_after_the_fetch() {
        let (mut app, _rx) = app_with(StubSource(Ok(day())), false);
        assert!(app.record.is_none());
        settle(&mut app);
        assert_eq!(app.record.as_ref().unwrap().gregorian_date, "14 March 2025");
        assert!(app.snapshot.is_some());
        assert!(app.ticker.as_ref().is_some_and(|t| t.is_running()));
    }

    #[test]
    fn failed_first_fetch_shows_the_reason() {
        let (mut app, _rx) = app_with(
            StubSource(Err(FetchError::LocationServicesDisabled)),
            false,
        );
        settle(&mut app);
        assert!(app.snapshot.is_none());
        assert_eq!(app.error, Some(FetchError::LocationServicesDisabled));
        assert!(app.ticker.is_none());
    }

    #[test]
    fn schedule_events_replace_the_snapshot() {
        let (mut app, _rx) = app_with(StubSource(Ok(day())), true);
        let later = compute_schedule(
            &PrayerTimeSet::sample(),
            chrono::NaiveDate::from_ymd_opt(2025, 3, 14)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
        );
        app.handle_event(Event::Schedule(later));
        assert_eq!(app.snapshot.unwrap().current_prayer, Prayer::Isha);
    }

    #[test]
    fn quitting_stops_the_ticker() {
        let (mut app, _rx) = app_with(StubSource(Ok(day())), true);
        assert!(app.ticker.is_some());

        app.handle_event(press(KeyCode::Char('?')));
        assert_eq!(app.view, View::Help);
        app.handle_event(press(KeyCode::Esc));
        assert_eq!(app.view, View::Dashboard);

        app.handle_event(press(KeyCode::Char('q')));
        assert!(app.should_quit);
        app.shutdown();
        assert!(app.ticker.is_none());
    }

    #[test]
    fn manual_refresh_fetches_even_when_fresh() {
        let (mut app, _rx) = app_with(StubSource(Ok(day())), true);
        app.handle_event(press(KeyCode::Char('r')));
        assert!(app.source.is_refreshing());
        settle(&mut app);
        assert!(app.record.is_some());
    }

    fn rendered(app: &App) -> String {
        use ratatui::{Terminal, backend::TestBackend};

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn header_uses_the_app_clock_before_any_record() {
        let (app, _rx) = app_with(StubSource(Err(FetchError::PermissionDenied)), false);
        assert!(app.record.is_none());
        assert!(rendered(&app).contains("Friday, Mar 14, 2025"));
    }

    #[test]
    fn dashboard_shows_the_fetched_dates() {
        let (app, _rx) = app_with(StubSource(Ok(day())), true);
        let screen = rendered(&app);
        assert!(screen.contains("14 March 2025"));
        assert!(screen.contains("Farz Prayers"));
    }
}
