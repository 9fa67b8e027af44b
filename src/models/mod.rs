pub mod prayer;
pub mod timings;

pub use prayer::{Prayer, PrayerTimeSet, TimingKey};
pub use timings::{CacheRecord, DailyTimings};
