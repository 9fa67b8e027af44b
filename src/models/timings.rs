use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::PrayerTimeSet;

/// One successful answer from the timings provider.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTimings {
    pub hijri_date: String,
    pub gregorian_date: String,
    pub timings: PrayerTimeSet,
}

/// What the cache persists: the last fetched day plus when it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub fetched_at: DateTime<Utc>,
    pub hijri_date: String,
    pub gregorian_date: String,
    pub timings: PrayerTimeSet,
}

impl CacheRecord {
    pub fn new(daily: DailyTimings, fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            hijri_date: daily.hijri_date,
            gregorian_date: daily.gregorian_date,
            timings: daily.timings,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }
}
