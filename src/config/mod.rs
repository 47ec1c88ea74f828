//! Configuration management for rota
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scheduler::schedule::DayPatterns;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Unit document storage
    pub storage: StorageConfig,

    /// Weekday layout of services
    pub schedule: ScheduleConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON document per unit
    pub data_dir: PathBuf,

    /// Optional JSON-lines audit file; audit goes to the log when unset
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

/// Which weekdays carry which kind of service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Weekdays with separate prelude and service slots
    pub two_phase_days: Vec<Weekday>,

    /// Weekdays with one slot needing both phase types
    pub single_phase_days: Vec<Weekday>,

    /// Weekday of the RJM schedule
    pub rjm_day: Weekday,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

fn parse_weekdays(var: &str, raw: &str) -> Result<Vec<Weekday>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Weekday>()
                .map_err(|_| anyhow::anyhow!("{var}: '{s}' is not a weekday"))
        })
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let data_dir = std::env::var("ROTA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage.data_dir);

        let audit_log = std::env::var("ROTA_AUDIT_LOG").ok().map(PathBuf::from);

        let two_phase_days = match std::env::var("ROTA_TWO_PHASE_DAYS") {
            Ok(raw) => parse_weekdays("ROTA_TWO_PHASE_DAYS", &raw)?,
            Err(_) => defaults.schedule.two_phase_days,
        };

        let single_phase_days = match std::env::var("ROTA_SINGLE_PHASE_DAYS") {
            Ok(raw) => parse_weekdays("ROTA_SINGLE_PHASE_DAYS", &raw)?,
            Err(_) => defaults.schedule.single_phase_days,
        };

        let rjm_day = match std::env::var("ROTA_RJM_DAY") {
            Ok(raw) => raw
                .trim()
                .parse::<Weekday>()
                .map_err(|_| anyhow::anyhow!("ROTA_RJM_DAY: '{raw}' is not a weekday"))?,
            Err(_) => defaults.schedule.rjm_day,
        };

        let level = std::env::var("ROTA_LOG_LEVEL").unwrap_or(defaults.logging.level);
        let format = std::env::var("ROTA_LOG_FORMAT").unwrap_or(defaults.logging.format);

        Ok(Self {
            storage: StorageConfig {
                data_dir,
                audit_log,
            },
            schedule: ScheduleConfig {
                two_phase_days,
                single_phase_days,
                rjm_day,
            },
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.as_os_str().is_empty() {
            anyhow::bail!("storage.data_dir must not be empty");
        }

        if let Some(day) = self
            .schedule
            .two_phase_days
            .iter()
            .find(|d| self.schedule.single_phase_days.contains(d))
        {
            anyhow::bail!("{day} is listed as both a two-phase and a single-phase day");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            );
        }

        Ok(())
    }

    /// Weekday → slot layout used by the generator
    pub fn day_patterns(&self) -> Result<DayPatterns> {
        Ok(DayPatterns::new(
            self.schedule.two_phase_days.iter().copied(),
            self.schedule.single_phase_days.iter().copied(),
        )?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: PathBuf::from("data/units"),
                audit_log: None,
            },
            schedule: ScheduleConfig {
                two_phase_days: vec![Weekday::Sun],
                single_phase_days: vec![Weekday::Tue],
                rjm_day: Weekday::Sun,
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::schedule::DayPattern;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlapping_days_rejected() {
        let mut config = Config::default();
        config.schedule.single_phase_days.push(Weekday::Sun);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("both a two-phase and a single-phase"));
        assert!(config.day_patterns().is_err());
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut config = Config::default();
        config.logging.format = String::from("xml");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_day_patterns_from_config() {
        let patterns = Config::default().day_patterns().unwrap();
        assert_eq!(patterns.classify(Weekday::Sun), DayPattern::TwoPhase);
        assert_eq!(patterns.classify(Weekday::Tue), DayPattern::SinglePhase);
    }

    #[test]
    fn test_parse_weekdays() {
        let days = parse_weekdays("X", "Sun, wed ,").unwrap();
        assert_eq!(days, vec![Weekday::Sun, Weekday::Wed]);
        assert!(parse_weekdays("X", "Funday").is_err());
    }
}
