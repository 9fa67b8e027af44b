use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The five Farz prayers in their fixed daily order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn index(self) -> usize {
        match self {
            Prayer::Fajr => 0,
            Prayer::Dhuhr => 1,
            Prayer::Asr => 2,
            Prayer::Maghrib => 3,
            Prayer::Isha => 4,
        }
    }

    /// Next prayer in the cycle. Isha wraps to Fajr of the following day.
    pub fn successor(self) -> Prayer {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }

    pub fn timing_key(self) -> TimingKey {
        match self {
            Prayer::Fajr => TimingKey::Fajr,
            Prayer::Dhuhr => TimingKey::Dhuhr,
            Prayer::Asr => TimingKey::Asr,
            Prayer::Maghrib => TimingKey::Maghrib,
            Prayer::Isha => TimingKey::Isha,
        }
    }
}

impl std::fmt::Display for Prayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Prayer {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fajr" => Ok(Prayer::Fajr),
            "dhuhr" | "zuhr" | "duhr" | "dhuhur" => Ok(Prayer::Dhuhr),
            "asr" => Ok(Prayer::Asr),
            "maghrib" => Ok(Prayer::Maghrib),
            "isha" | "ishaa" => Ok(Prayer::Isha),
            _ => Err(anyhow::anyhow!(
                "Unknown prayer '{}'. Use: fajr, dhuhr, asr, maghrib, isha",
                s
            )),
        }
    }
}

/// Every named time the timings provider reports for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingKey {
    Imsak,
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
    Sunset,
    Midnight,
}

impl TimingKey {
    /// Provider order.
    pub const ALL: [TimingKey; 9] = [
        TimingKey::Imsak,
        TimingKey::Fajr,
        TimingKey::Sunrise,
        TimingKey::Dhuhr,
        TimingKey::Asr,
        TimingKey::Maghrib,
        TimingKey::Isha,
        TimingKey::Sunset,
        TimingKey::Midnight,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TimingKey::Imsak => "Imsak",
            TimingKey::Fajr => "Fajr",
            TimingKey::Sunrise => "Sunrise",
            TimingKey::Dhuhr => "Dhuhr",
            TimingKey::Asr => "Asr",
            TimingKey::Maghrib => "Maghrib",
            TimingKey::Isha => "Isha",
            TimingKey::Sunset => "Sunset",
            TimingKey::Midnight => "Midnight",
        }
    }
}

/// One day's wall-clock timings. Values carry no date; the schedule engine
/// places them on today or tomorrow as needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrayerTimeSet {
    #[serde(with = "hhmm")]
    pub imsak: NaiveTime,
    #[serde(with = "hhmm")]
    pub fajr: NaiveTime,
    #[serde(with = "hhmm")]
    pub sunrise: NaiveTime,
    #[serde(with = "hhmm")]
    pub dhuhr: NaiveTime,
    #[serde(with = "hhmm")]
    pub asr: NaiveTime,
    #[serde(with = "hhmm")]
    pub maghrib: NaiveTime,
    #[serde(with = "hhmm")]
    pub isha: NaiveTime,
    #[serde(with = "hhmm")]
    pub sunset: NaiveTime,
    #[serde(with = "hhmm")]
    pub midnight: NaiveTime,
}

impl PrayerTimeSet {
    pub fn get(&self, key: TimingKey) -> NaiveTime {
        match key {
            TimingKey::Imsak => self.imsak,
            TimingKey::Fajr => self.fajr,
            TimingKey::Sunrise => self.sunrise,
            TimingKey::Dhuhr => self.dhuhr,
            TimingKey::Asr => self.asr,
            TimingKey::Maghrib => self.maghrib,
            TimingKey::Isha => self.isha,
            TimingKey::Sunset => self.sunset,
            TimingKey::Midnight => self.midnight,
        }
    }

    pub fn start_of(&self, prayer: Prayer) -> NaiveTime {
        self.get(prayer.timing_key())
    }
}

#[cfg(test)]
impl PrayerTimeSet {
    /// Fajr 05:00, Dhuhr 12:00, Asr 15:30, Maghrib 18:00, Isha 19:30.
    pub fn sample() -> Self {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        Self {
            imsak: t(4, 50),
            fajr: t(5, 0),
            sunrise: t(6, 25),
            dhuhr: t(12, 0),
            asr: t(15, 30),
            maghrib: t(18, 0),
            isha: t(19, 30),
            sunset: t(18, 0),
            midnight: t(0, 10),
        }
    }
}

/// Parse a provider time such as `"05:12"` or `"05:12 (BST)"`.
/// Seconds are never present; anything after the first token is ignored.
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    let token = s.split_whitespace().next()?;
    NaiveTime::parse_from_str(token, "%H:%M").ok()
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_hhmm(&raw).ok_or_else(|| D::Error::custom(format!("bad time '{}'", raw)))
    }
}
