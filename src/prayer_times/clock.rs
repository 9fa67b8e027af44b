use chrono::{DateTime, Local};
use std::sync::Arc;

/// Source of wall-clock time. The schedule is computed in the device's
/// local timezone, the same one the provider's timings are expressed in.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Local> {
        (**self).now()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[cfg(test)]
pub struct FixedClock(pub std::sync::Mutex<DateTime<Local>>);

#[cfg(test)]
impl FixedClock {
    pub fn at(h: u32, m: u32) -> Self {
        use chrono::TimeZone;
        let now = Local
            .with_ymd_and_hms(2025, 3, 14, h, m, 0)
            .single()
            .expect("unambiguous local time");
        Self(std::sync::Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.0.lock().unwrap() = now;
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.0.lock().unwrap()
    }
}
