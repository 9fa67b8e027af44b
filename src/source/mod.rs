//! Where daily timings come from: a location provider plus the remote
//! timings API. One call performs at most one location read and one request;
//! retrying is the cache's business.

pub mod aladhan;
pub mod location;

use thiserror::Error;

use crate::models::DailyTimings;

pub use aladhan::AladhanClient;
pub use location::{Coordinates, LocationProvider};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location services are disabled")]
    LocationServicesDisabled,

    #[error("network or API failure: {0}")]
    NetworkOrApiFailure(String),

    #[error("malformed timings response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// Short text suitable for showing in place of the schedule.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::PermissionDenied => "Location permission required",
            FetchError::LocationServicesDisabled => "Please enable location services",
            FetchError::NetworkOrApiFailure(_) => "Failed to fetch prayer times",
            FetchError::MalformedResponse(_) => "Unable to load prayer times",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::NetworkOrApiFailure(e.to_string())
    }
}

pub trait TimingsSource: Send + Sync {
    fn fetch_timings(&self) -> Result<DailyTimings, FetchError>;
}
