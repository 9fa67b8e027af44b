use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_location_name() -> String {
    "Islamabad".to_string()
}
fn default_latitude() -> Option<f64> {
    Some(33.6938)
}
fn default_longitude() -> Option<f64> {
    Some(73.0651)
}
fn default_base_url() -> String {
    "https://api.aladhan.com/v1".to_string()
}
fn default_method() -> u8 {
    // University of Islamic Sciences, Karachi
    1
}
fn default_school() -> u8 {
    // Hanafi Asr
    1
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_ip_lookup_url() -> String {
    "http://ip-api.com/json".to_string()
}
/// Longest fixed TTL accepted from config: one year.
pub const MAX_TTL_HOURS: u64 = 24 * 366;

fn default_ttl_hours() -> u64 {
    12
}
fn default_refresh_interval_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LocationSource {
    /// Coordinates from this file
    #[default]
    Config,
    /// Coarse position from an IP geolocation lookup
    Ip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub source: LocationSource,
    #[serde(default = "default_location_name")]
    pub name: String,
    #[serde(default = "default_latitude")]
    pub latitude: Option<f64>,
    #[serde(default = "default_longitude")]
    pub longitude: Option<f64>,
    /// Consent to use the location at all. `false` behaves like a denied
    /// permission prompt.
    #[serde(default = "default_true")]
    pub share_location: bool,
    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSource::default(),
            name: default_location_name(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            share_location: true,
            ip_lookup_url: default_ip_lookup_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Aladhan calculation method id
    #[serde(default = "default_method")]
    pub method: u8,
    /// Asr juristic school: 0 = Shafi, 1 = Hanafi
    #[serde(default = "default_school")]
    pub school: u8,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            method: default_method(),
            school: default_school(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicyKind {
    #[default]
    FixedTtl,
    CalendarDay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub policy: CachePolicyKind,
    /// Only used by the fixed-ttl policy
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            policy: CachePolicyKind::default(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClockFormat {
    #[default]
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default)]
    pub clock_format: ClockFormat,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            clock_format: ClockFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "waqt").context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("waqt.db"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
        let config: AppConfig = toml::from_str(&content).context("Parsing config.toml")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.cache.ttl_hours > MAX_TTL_HOURS {
            bail!(
                "cache.ttl_hours is {} but must be at most {}",
                self.cache.ttl_hours,
                MAX_TTL_HOURS
            );
        }
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load_from_path(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.api.method, 1);
        assert_eq!(config.api.school, 1);
        assert_eq!(config.cache.policy, CachePolicyKind::FixedTtl);
        assert_eq!(config.cache.ttl_hours, 12);
        assert_eq!(config.display.refresh_interval_secs, 30);
        assert_eq!(config.location.source, LocationSource::Config);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[location]
source = "ip"
share_location = false

[cache]
policy = "calendar-day"

[display]
clock_format = "24h"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.location.source, LocationSource::Ip);
        assert!(!config.location.share_location);
        assert_eq!(config.location.name, "Islamabad");
        assert_eq!(config.cache.policy, CachePolicyKind::CalendarDay);
        assert_eq!(config.cache.ttl_hours, 12);
        assert_eq!(config.display.clock_format, ClockFormat::TwentyFourHour);
        assert_eq!(config.api.base_url, "https://api.aladhan.com/v1");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.location.name = "Lahore".to_string();
        config.cache.ttl_hours = 6;
        config.save_to_path(&path).unwrap();

        let loaded = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.location.name, "Lahore");
        assert_eq!(loaded.cache.ttl_hours, 6);
    }

    #[test]
    fn oversized_ttl_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\nttl_hours = 4611686018427387903\n").unwrap();
        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("ttl_hours"));

        std::fs::write(&path, format!("[cache]\nttl_hours = {}\n", MAX_TTL_HOURS)).unwrap();
        assert!(AppConfig::load_from_path(&path).is_ok());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\npolicy = \"forever\"\n").unwrap();
        assert!(AppConfig::load_from_path(&path).is_err());
    }
}
