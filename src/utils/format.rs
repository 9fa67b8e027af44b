use chrono::NaiveTime;

use crate::config::ClockFormat;

/// Format a NaiveTime for display, e.g. "5:07 AM" or "05:07"
pub fn format_time(t: NaiveTime, clock: ClockFormat) -> String {
    match clock {
        ClockFormat::TwelveHour => t.format("%-I:%M %p").to_string(),
        ClockFormat::TwentyFourHour => t.format("%H:%M").to_string(),
    }
}

/// Format a start/end pair as "start - end"
pub fn format_range(start: NaiveTime, end: NaiveTime, clock: ClockFormat) -> String {
    format!("{} - {}", format_time(start, clock), format_time(end, clock))
}

/// Format an age in seconds as "Xh Ym ago", "Ym ago" or "just now"
pub fn format_age_secs(secs: i64) -> String {
    if secs < 60 {
        return "just now".to_string();
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m ago", hours, minutes)
    } else {
        format!("{}m ago", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn twelve_hour_clock() {
        assert_eq!(format_time(t(5, 7), ClockFormat::TwelveHour), "5:07 AM");
        assert_eq!(format_time(t(12, 0), ClockFormat::TwelveHour), "12:00 PM");
        assert_eq!(format_time(t(0, 10), ClockFormat::TwelveHour), "12:10 AM");
        assert_eq!(format_time(t(19, 30), ClockFormat::TwelveHour), "7:30 PM");
    }

    #[test]
    fn twenty_four_hour_clock() {
        assert_eq!(format_time(t(5, 7), ClockFormat::TwentyFourHour), "05:07");
        assert_eq!(format_time(t(19, 30), ClockFormat::TwentyFourHour), "19:30");
    }

    #[test]
    fn range() {
        assert_eq!(
            format_range(t(5, 0), t(6, 25), ClockFormat::TwentyFourHour),
            "05:00 - 06:25"
        );
    }

    #[test]
    fn ages() {
        assert_eq!(format_age_secs(30), "just now");
        assert_eq!(format_age_secs(5 * 60), "5m ago");
        assert_eq!(format_age_secs(3 * 3600 + 120), "3h 2m ago");
    }
}
