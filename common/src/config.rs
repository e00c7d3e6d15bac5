use std::time::Duration;

use co2_pico_model::{FeedSpec, DEFAULT_FEEDS, DEFAULT_TREND_CAPACITY};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings of the agent, read once at startup.
///
/// Every field has a default, so a configuration file only needs to name
/// what it changes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Pause between two polls of the sensor.
    pub cycle_interval_secs: u64,
    /// Pause between a fault and the device reset.
    pub reset_delay_secs: u64,
    /// Number of CO2 values on the trend plot.
    pub trend_capacity: usize,
    /// Local timezone, whole hours east of UTC.
    pub tz_offset_hours: i32,
    pub splash_text: String,
    pub splash_secs: u64,
    pub feeds: Vec<FeedSpec>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: 10,
            reset_delay_secs: 10,
            trend_capacity: DEFAULT_TREND_CAPACITY,
            tz_offset_hours: 0,
            splash_text: "PVOS CO2".into(),
            splash_secs: 1,
            feeds: DEFAULT_FEEDS.to_vec(),
        }
    }
}

impl AgentConfig {
    /// Names a JSON configuration file.
    pub const PATH_VAR: &'static str = "CO2_PICO_CONFIG";
    /// Overrides `tz_offset_hours`.
    pub const TZ_OFFSET_VAR: &'static str = "TZ_OFFSET";

    /// Parse a configuration. At least one feed is required.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.feeds.is_empty() {
            return Err(ConfigError::NoFeeds);
        }
        Ok(config)
    }

    /// Defaults, overlaid with the file named by `CO2_PICO_CONFIG` and the
    /// `TZ_OFFSET` variable, when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(Self::PATH_VAR) {
            Ok(path) => {
                let json = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                Self::from_json(&json)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(offset) = std::env::var(Self::TZ_OFFSET_VAR) {
            config.set_tz_offset(&offset)?;
        }

        Ok(config)
    }

    /// Parse a whole-hour offset such as `-5` or `+2`.
    pub fn set_tz_offset(&mut self, raw: &str) -> Result<(), ConfigError> {
        let trimmed = raw.trim();
        let hours = trimmed
            .strip_prefix('+')
            .unwrap_or(trimmed)
            .parse::<i32>()
            .map_err(|_| ConfigError::TzOffset(raw.to_string()))?;

        if !(-12..=14).contains(&hours) {
            return Err(ConfigError::TzOffset(raw.to_string()));
        }

        self.tz_offset_hours = hours;
        Ok(())
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_secs(self.reset_delay_secs)
    }

    pub fn splash_duration(&self) -> Duration {
        Duration::from_secs(self.splash_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use co2_pico_model::Metric;

    #[test]
    fn missing_fields_use_defaults() {
        let config = AgentConfig::from_json(r#"{"cycle_interval_secs": 5}"#).unwrap();

        assert_eq!(config.cycle_interval(), Duration::from_secs(5));
        assert_eq!(config.reset_delay(), Duration::from_secs(10));
        assert_eq!(config.trend_capacity, 100);
        assert_eq!(config.feeds, DEFAULT_FEEDS.to_vec());
    }

    #[test]
    fn feed_table_can_be_replaced() {
        let config = AgentConfig::from_json(
            r#"{"feeds": [{"metric": "co2", "remote_key": "co2-lab"}]}"#,
        )
        .unwrap();

        assert_eq!(config.feeds.len(), 1);
        assert_eq!(config.feeds[0].metric, Metric::Co2);
        assert_eq!(config.feeds[0].remote_key, "co2-lab");
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            AgentConfig::from_json("{cycle_interval_secs: 5}"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn empty_feed_table_is_rejected() {
        assert!(matches!(
            AgentConfig::from_json(r#"{"feeds": []}"#),
            Err(ConfigError::NoFeeds)
        ));
    }

    #[test]
    fn tz_offset_parsing() {
        let mut config = AgentConfig::default();

        config.set_tz_offset("-5").unwrap();
        assert_eq!(config.tz_offset_hours, -5);

        config.set_tz_offset(" +2 ").unwrap();
        assert_eq!(config.tz_offset_hours, 2);

        assert!(config.set_tz_offset("EST").is_err());
        assert!(config.set_tz_offset("20").is_err());
        assert_eq!(config.tz_offset_hours, 2);
    }
}
