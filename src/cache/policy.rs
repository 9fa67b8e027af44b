use chrono::{DateTime, Duration, Local, Utc};
use log::warn;

use crate::config::CachePolicyKind;
use crate::config::settings::{CacheConfig, MAX_TTL_HOURS};

/// When a cached day stops being good enough. One policy per cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Stale once older than the TTL.
    FixedTtl(Duration),
    /// Valid only while the local calendar date is the one it was fetched on.
    CalendarDay,
}

impl CachePolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        match config.policy {
            CachePolicyKind::FixedTtl => {
                let hours = config.ttl_hours.min(MAX_TTL_HOURS);
                if hours != config.ttl_hours {
                    warn!("Cache ttl_hours {} clamped to {}", config.ttl_hours, hours);
                }
                let ttl = i64::try_from(hours)
                    .ok()
                    .and_then(Duration::try_hours)
                    .unwrap_or(Duration::hours(12));
                CachePolicy::FixedTtl(ttl)
            }
            CachePolicyKind::CalendarDay => CachePolicy::CalendarDay,
        }
    }

    pub fn is_stale(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            CachePolicy::FixedTtl(ttl) => now - fetched_at > *ttl,
            CachePolicy::CalendarDay => {
                fetched_at.with_timezone(&Local).date_naive()
                    != now.with_timezone(&Local).date_naive()
            }
        }
    }
}

impl std::fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CachePolicy::FixedTtl(ttl) => write!(f, "fixed ttl ({}h)", ttl.num_hours()),
            CachePolicy::CalendarDay => write!(f, "calendar day"),
        }
    }
}
