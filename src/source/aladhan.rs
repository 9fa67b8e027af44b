use log::{debug, info};
use serde::Deserialize;
use std::time::Duration;

use super::{FetchError, LocationProvider, TimingsSource};
use crate::config::settings::ApiConfig;
use crate::models::{DailyTimings, PrayerTimeSet, TimingKey};

// ─── Wire format ─────────────────────────────────────────────────────────────

/// `data` is a day on success and an error string otherwise.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: u16,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Day {
    timings: PrayerTimeSet,
    date: DayDate,
}

#[derive(Debug, Deserialize)]
struct DayDate {
    hijri: CalendarDate,
    gregorian: CalendarDate,
}

#[derive(Debug, Deserialize)]
struct CalendarDate {
    day: String,
    month: MonthName,
    year: String,
}

#[derive(Debug, Deserialize)]
struct MonthName {
    en: String,
}

impl CalendarDate {
    fn formatted(&self) -> String {
        format!("{} {} {}", self.day, self.month.en, self.year)
    }
}

/// Turn a `/timings` response body into a day's timings.
pub fn parse_timings_response(body: &str) -> Result<DailyTimings, FetchError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("not a timings payload: {}", e)))?;

    if envelope.code != 200 {
        let detail = envelope.data.as_str().unwrap_or("no detail");
        return Err(FetchError::MalformedResponse(format!(
            "status code {}: {}",
            envelope.code, detail
        )));
    }

    let day: Day = serde_json::from_value(envelope.data)
        .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

    Ok(DailyTimings {
        hijri_date: day.date.hijri.formatted(),
        gregorian_date: day.date.gregorian.formatted(),
        timings: day.timings,
    })
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Aladhan `/timings` for wherever the location provider says we are.
pub struct AladhanClient<L> {
    http: reqwest::blocking::Client,
    base_url: String,
    method: u8,
    school: u8,
    location: L,
}

impl<L: LocationProvider> AladhanClient<L> {
    pub fn new(api: &ApiConfig, location: L) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            method: api.method,
            school: api.school,
            location,
        })
    }
}

impl<L: LocationProvider> TimingsSource for AladhanClient<L> {
    fn fetch_timings(&self) -> Result<DailyTimings, FetchError> {
        if !self.location.permission_granted() {
            return Err(FetchError::PermissionDenied);
        }
        if !self.location.services_enabled() {
            return Err(FetchError::LocationServicesDisabled);
        }

        let coords = self.location.current_position()?;
        let url = format!("{}/timings", self.base_url);
        debug!(
            "GET {} lat={} lng={} method={} school={}",
            url, coords.latitude, coords.longitude, self.method, self.school
        );

        let response = self
            .http
            .get(&url)
            .query(&[
                ("latitude", coords.latitude.to_string()),
                ("longitude", coords.longitude.to_string()),
                ("method", self.method.to_string()),
                ("school", self.school.to_string()),
            ])
            .send()?;

        let status = response.status();
        let body = response.text()?;

        // An error page from a proxy or server is a transport problem, not a bad payload
        if !status.is_success() && serde_json::from_str::<Envelope>(&body).is_err() {
            return Err(FetchError::NetworkOrApiFailure(format!("HTTP {}", status)));
        }

        let daily = parse_timings_response(&body)?;
        info!("Fetched timings for {}", daily.gregorian_date);
        for key in TimingKey::ALL {
            debug!("  {:<9} {}", key.label(), daily.timings.get(key).format("%H:%M"));
        }
        Ok(daily)
    }
}
