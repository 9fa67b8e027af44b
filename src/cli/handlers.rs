use anyhow::Result;
use chrono::NaiveDateTime;
use std::sync::Arc;

use crate::cache::TimingsCache;
use crate::config::{AppConfig, ClockFormat};
use crate::models::{CacheRecord, Prayer};
use crate::prayer_times::schedule::time_until;
use crate::prayer_times::{Clock, compute_schedule, day_table, other_times};
use crate::utils::format::{format_age_secs, format_range, format_time};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

// ─── Times ───────────────────────────────────────────────────────────────────

pub fn handle_times(
    cache: &Arc<TimingsCache>,
    clock: &dyn Clock,
    config: &AppConfig,
    prayer: Option<&str>,
) -> Result<()> {
    let only = prayer.map(str::parse::<Prayer>).transpose()?;

    let record = match cache.load_or_refresh().wait() {
        Ok(record) => record,
        Err(e) => {
            println_colored!(RED, "  {}", e.user_message());
            return Err(e.into());
        }
    };

    let now = clock.now();
    match only {
        Some(prayer) => print_prayer(&record, prayer, now.naive_local(), config.display.clock_format),
        None => print_day(&record, now.naive_local(), config),
    }

    let age = record.age(now.to_utc()).num_seconds();
    println_colored!(DIM, "  Updated {}", format_age_secs(age));
    println!();
    Ok(())
}

fn print_prayer(record: &CacheRecord, prayer: Prayer, now: NaiveDateTime, clock: ClockFormat) {
    let Some(row) = day_table(&record.timings, now)
        .into_iter()
        .find(|row| row.prayer == prayer)
    else {
        return;
    };

    println!();
    let range = format_range(row.start, row.end, clock);
    if row.is_current {
        println_colored!(GREEN, "  {:<10}  {:<22} ◂ now", prayer.display_name(), range);
    } else {
        println_colored!(BOLD, "  {:<10}  {}", prayer.display_name(), range);
        println_colored!(AMBER, "  Starts in {}", time_until(row.start, now));
    }
    println!();
}

fn print_day(record: &CacheRecord, now: NaiveDateTime, config: &AppConfig) {
    let clock = config.display.clock_format;
    let timings = &record.timings;

    println!();
    println_colored!(GOLD, "  Prayer Times · {}", config.location.name);
    println_colored!(DIM, "  {}  ·  {}", record.hijri_date, record.gregorian_date);
    println!();

    for row in day_table(timings, now) {
        let range = format_range(row.start, row.end, clock);
        if row.is_current {
            println_colored!(GREEN, "  {:<10}  {:<22} ◂ now", row.prayer.display_name(), range);
        } else {
            println_colored!(BOLD, "  {:<10}  {}", row.prayer.display_name(), range);
        }
    }

    println!();
    for (label, time) in other_times(timings) {
        println_colored!(DIM, "  {:<18}  {}", label, format_time(time, clock));
    }

    let snapshot = compute_schedule(timings, now);
    println!();
    println_colored!(
        BOLD,
        "  Now:  {} (since {})",
        snapshot.current_prayer.display_name(),
        format_time(snapshot.current_prayer_time, clock)
    );
    println_colored!(
        AMBER,
        "  Next: {} at {} in {}",
        snapshot.next_prayer.display_name(),
        format_time(snapshot.next_prayer_time, clock),
        snapshot.time_remaining
    );
    println_colored!(
        DIM,
        "  Sahri {}  ·  Iftar {}",
        format_time(snapshot.sahri_time, clock),
        format_time(snapshot.iftar_time, clock)
    );
    println!();
}

// ─── Refresh ─────────────────────────────────────────────────────────────────

pub fn handle_refresh(cache: &TimingsCache, clock_format: ClockFormat) -> Result<()> {
    match cache.refresh() {
        Ok(record) => {
            println_colored!(
                GREEN,
                "  ✓ Updated timings for {} ({})",
                record.gregorian_date,
                record.hijri_date
            );
            println_colored!(
                DIM,
                "  Fajr {}  ·  Maghrib {}",
                format_time(record.timings.fajr, clock_format),
                format_time(record.timings.maghrib, clock_format)
            );
            Ok(())
        }
        Err(e) => {
            println_colored!(RED, "  ✗ {}", e.user_message());
            Err(e.into())
        }
    }
}

// ─── Config ──────────────────────────────────────────────────────────────────

pub fn handle_config(config: &AppConfig, init: bool) -> Result<()> {
    let path = AppConfig::config_path()?;

    if init {
        if path.exists() {
            println_colored!(AMBER, "  Config already exists at {}", path.display());
        } else {
            AppConfig::default().save_to_path(&path)?;
            println_colored!(GREEN, "  ✓ Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    let state = if path.exists() { "" } else { " (not created, using defaults)" };
    println_colored!(GOLD, "  {}{}", path.display(), state);
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
