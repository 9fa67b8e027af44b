use chrono::{NaiveDateTime, NaiveTime, Timelike};
use log::debug;

use crate::models::{Prayer, PrayerTimeSet, TimingKey};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Whole hours and minutes until the next prayer. Always under 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRemaining {
    pub hours: u32,
    pub minutes: u32,
}

impl TimeRemaining {
    fn from_minutes(total: i64) -> Self {
        let total = total.clamp(0, MINUTES_PER_DAY - 1) as u32;
        Self {
            hours: total / 60,
            minutes: total % 60,
        }
    }

    pub fn total_minutes(&self) -> u32 {
        self.hours * 60 + self.minutes
    }
}

impl std::fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.hours == 0 {
            write!(f, "{} min", self.minutes)
        } else {
            write!(f, "{}h {}m", self.hours, self.minutes)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    pub current_prayer: Prayer,
    pub current_prayer_time: NaiveTime,
    pub next_prayer: Prayer,
    pub next_prayer_time: NaiveTime,
    pub time_remaining: TimeRemaining,
    /// Last time to eat before the fast (Imsak).
    pub sahri_time: NaiveTime,
    /// Breaking the fast (Maghrib).
    pub iftar_time: NaiveTime,
}

/// One row of the day's Farz table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleRow {
    pub prayer: Prayer,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub is_current: bool,
}

fn minute_of_day(t: NaiveTime) -> i64 {
    t.hour() as i64 * 60 + t.minute() as i64
}

/// Half-open `[start, end)`. When `start > end` the window runs past midnight.
fn in_window(start: i64, end: i64, now: i64) -> bool {
    if start <= end {
        start <= now && now < end
    } else {
        now >= start || now < end
    }
}

/// The prayer whose window contains `now`, if any.
///
/// Each window runs from a prayer's start to the start of its successor, so a
/// well-formed day covers all 24 hours. `None` only happens for degenerate
/// input such as every prayer sharing the same time.
pub fn current_prayer(timings: &PrayerTimeSet, now: NaiveTime) -> Option<Prayer> {
    let now_min = minute_of_day(now);
    Prayer::ALL.into_iter().find(|&prayer| {
        let start = minute_of_day(timings.start_of(prayer));
        let end = minute_of_day(timings.start_of(prayer.successor()));
        in_window(start, end, now_min)
    })
}

fn locate(timings: &PrayerTimeSet, now: NaiveTime) -> (Prayer, Prayer) {
    match current_prayer(timings, now) {
        Some(prayer) => (prayer, prayer.successor()),
        None => {
            debug!(
                "no prayer window contains {}, falling back to Isha",
                now.format("%H:%M")
            );
            (Prayer::Isha, Prayer::Fajr)
        }
    }
}

/// Time from `now` to the next occurrence of `target`.
///
/// `target` is read as today's time; once it has passed it refers to
/// tomorrow. A target equal to `now` is zero minutes away.
pub fn time_until(target: NaiveTime, now: NaiveDateTime) -> TimeRemaining {
    let delta = (minute_of_day(target) - minute_of_day(now.time())).rem_euclid(MINUTES_PER_DAY);
    TimeRemaining::from_minutes(delta)
}

/// Derive the current/next prayer and countdown. Seconds are ignored.
pub fn compute_schedule(timings: &PrayerTimeSet, now: NaiveDateTime) -> ScheduleSnapshot {
    let (current, next) = locate(timings, now.time());
    let next_prayer_time = timings.start_of(next);

    ScheduleSnapshot {
        current_prayer: current,
        current_prayer_time: timings.start_of(current),
        next_prayer: next,
        next_prayer_time,
        time_remaining: time_until(next_prayer_time, now),
        sahri_time: timings.imsak,
        iftar_time: timings.maghrib,
    }
}

/// The five Farz rows for display. Fajr's displayed window ends at sunrise;
/// the rest end where the next prayer begins.
///
/// A row is current only inside its own displayed window, so between sunrise
/// and Dhuhr no row is marked.
pub fn day_table(timings: &PrayerTimeSet, now: NaiveDateTime) -> Vec<ScheduleRow> {
    let now_min = minute_of_day(now.time());

    Prayer::ALL
        .into_iter()
        .map(|prayer| {
            let start = timings.start_of(prayer);
            let end = match prayer {
                Prayer::Fajr => timings.sunrise,
                _ => timings.start_of(prayer.successor()),
            };
            ScheduleRow {
                prayer,
                start,
                end,
                is_current: in_window(minute_of_day(start), minute_of_day(end), now_min),
            }
        })
        .collect()
}

/// Non-Farz times shown alongside the table.
pub fn other_times(timings: &PrayerTimeSet) -> [(&'static str, NaiveTime); 4] {
    [TimingKey::Imsak, TimingKey::Sunrise, TimingKey::Sunset, TimingKey::Midnight].map(|key| {
        let label = match key {
            TimingKey::Imsak => "Sahri (last time)",
            _ => key.label(),
        };
        (label, timings.get(key))
    })
}
