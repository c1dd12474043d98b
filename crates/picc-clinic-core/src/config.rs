//! Clinic configuration, loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::{CalendarService, WeekendRule, DEFAULT_MAX_SEARCH_DAYS};
use crate::schedule::{SlotGrid, DEFAULT_SLOT_CAPACITY};
use picc_clinic_imaging::{OutputFormat, RenderOptions, DEFAULT_JPEG_QUALITY};

/// Overrides `api_base_url` when set.
pub const API_URL_ENV: &str = "PICC_CLINIC_API_URL";

pub const DEFAULT_LOG_FILTER: &str = "info,picc_clinic_core=debug";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    /// Site identifier; decides which tracks the grid shows
    pub ambulatorio: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub slot_capacity: usize,
    pub weekend: WeekendRule,
    pub log_filter: String,
    pub jpeg_quality: u8,
    pub max_search_days: u32,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            ambulatorio: "pta_centro".to_string(),
            api_base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            slot_capacity: DEFAULT_SLOT_CAPACITY,
            weekend: WeekendRule::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_search_days: DEFAULT_MAX_SEARCH_DAYS,
        }
    }
}

impl ClinicConfig {
    /// Parse a JSON document. Missing keys take their defaults; an empty
    /// string yields the defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: ClinicConfig = if json.trim().is_empty() {
            ClinicConfig::default()
        } else {
            serde_json::from_str(json)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Apply `PICC_CLINIC_API_URL` if present.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
        self
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.ambulatorio.trim().is_empty() {
            return Err(ConfigError::Invalid("ambulatorio is empty".to_string()));
        }
        if self.slot_capacity == 0 {
            return Err(ConfigError::Invalid("slot_capacity must be at least 1".to_string()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality {} outside 1..=100",
                self.jpeg_quality
            )));
        }
        if self.max_search_days == 0 {
            return Err(ConfigError::Invalid("max_search_days must be positive".to_string()));
        }
        Ok(())
    }

    pub fn grid(&self) -> SlotGrid {
        SlotGrid::for_site(&self.ambulatorio, self.slot_capacity)
    }

    pub fn calendar(&self) -> CalendarService {
        CalendarService::new(self.weekend, self.max_search_days)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            format: OutputFormat::Jpeg {
                quality: self.jpeg_quality,
            },
            ..RenderOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;
    use chrono::Weekday;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClinicConfig::from_json("").unwrap();
        assert_eq!(config, ClinicConfig::default());
        assert_eq!(config.slot_capacity, 2);
        assert_eq!(config.weekend, WeekendRule([Weekday::Sat, Weekday::Sun]));
        assert_eq!(config.grid().tracks(), &[Track::Picc, Track::Med]);
        assert_eq!(
            config.render_options().format,
            OutputFormat::Jpeg { quality: 90 }
        );
    }

    #[test]
    fn test_partial_json() {
        let config = ClinicConfig::from_json(
            r#"{"ambulatorio": "villa_ginestre", "weekend": ["Fri", "Sat"]}"#,
        )
        .unwrap();
        assert_eq!(config.grid().tracks(), &[Track::Picc]);
        assert_eq!(config.weekend, WeekendRule([Weekday::Fri, Weekday::Sat]));
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            ClinicConfig::from_json(r#"{"slot_capacity": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClinicConfig::from_json(r#"{"jpeg_quality": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClinicConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"slot_capacity": 3}}"#).unwrap();
        let config = ClinicConfig::from_file(file.path()).unwrap();
        assert_eq!(config.grid().capacity_of(&crate::models::Slot::new("09:00", Track::Picc)), 3);

        assert!(matches!(
            ClinicConfig::from_file("/nonexistent/picc.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
