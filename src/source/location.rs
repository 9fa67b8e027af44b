use log::{debug, warn};
use serde::Deserialize;
use std::time::Duration;

use super::FetchError;
use crate::config::LocationSource;
use crate::config::settings::LocationConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// Device position, guarded by a permission and a services switch.
/// Callers check both before asking for a position.
pub trait LocationProvider: Send + Sync {
    fn permission_granted(&self) -> bool;
    fn services_enabled(&self) -> bool;
    fn current_position(&self) -> Result<Coordinates, FetchError>;
}

impl<T: LocationProvider + ?Sized> LocationProvider for Box<T> {
    fn permission_granted(&self) -> bool {
        (**self).permission_granted()
    }

    fn services_enabled(&self) -> bool {
        (**self).services_enabled()
    }

    fn current_position(&self) -> Result<Coordinates, FetchError> {
        (**self).current_position()
    }
}

/// Build the provider selected in `[location]`.
pub fn from_config(
    config: &LocationConfig,
    timeout: Duration,
) -> Result<Box<dyn LocationProvider>, FetchError> {
    Ok(match config.source {
        LocationSource::Config => Box::new(ConfiguredLocation::from_config(config)),
        LocationSource::Ip => Box::new(IpLocation::new(config, timeout)?),
    })
}

// ─── Fixed coordinates ───────────────────────────────────────────────────────

/// Coordinates written in the config file. Without usable coordinates the
/// provider reports its services as disabled.
pub struct ConfiguredLocation {
    granted: bool,
    coordinates: Option<Coordinates>,
}

impl ConfiguredLocation {
    pub fn new(granted: bool, coordinates: Option<Coordinates>) -> Self {
        Self {
            granted,
            coordinates,
        }
    }

    pub fn from_config(config: &LocationConfig) -> Self {
        let coordinates = match (config.latitude, config.longitude) {
            (Some(lat), Some(lng)) => {
                let coords = Coordinates::new(lat, lng);
                if coords.is_none() {
                    warn!("Ignoring out-of-range coordinates ({}, {})", lat, lng);
                }
                coords
            }
            _ => None,
        };
        Self::new(config.share_location, coordinates)
    }
}

impl LocationProvider for ConfiguredLocation {
    fn permission_granted(&self) -> bool {
        self.granted
    }

    fn services_enabled(&self) -> bool {
        self.coordinates.is_some()
    }

    fn current_position(&self) -> Result<Coordinates, FetchError> {
        self.coordinates.ok_or(FetchError::LocationServicesDisabled)
    }
}

// ─── IP geolocation ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IpLookup {
    status: String,
    #[serde(default)]
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// City-level position from an ip-api.com style lookup.
pub struct IpLocation {
    granted: bool,
    url: String,
    http: reqwest::blocking::Client,
}

impl IpLocation {
    pub fn new(config: &LocationConfig, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            granted: config.share_location,
            url: config.ip_lookup_url.clone(),
            http,
        })
    }
}

impl LocationProvider for IpLocation {
    fn permission_granted(&self) -> bool {
        self.granted
    }

    fn services_enabled(&self) -> bool {
        true
    }

    fn current_position(&self) -> Result<Coordinates, FetchError> {
        debug!("Looking up position via {}", self.url);
        let lookup: IpLookup = self.http.get(&self.url).send()?.error_for_status()?.json()?;
        if lookup.status != "success" {
            let reason = lookup.message.unwrap_or(lookup.status);
            return Err(FetchError::NetworkOrApiFailure(format!(
                "IP geolocation failed: {}",
                reason
            )));
        }
        match (lookup.lat, lookup.lon) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon).ok_or_else(|| {
                FetchError::NetworkOrApiFailure("IP geolocation returned bad coordinates".into())
            }),
            _ => Err(FetchError::NetworkOrApiFailure(
                "IP geolocation returned no coordinates".into(),
            )),
        }
    }
}
