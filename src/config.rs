//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable overrides for paths and the stake currency. Every field has a
//! default, so a config file only needs the keys it changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::data::{TimeRange, TimeRangeError};
use crate::Interval;

/// Configuration problems detected before any work starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("'{0}' must contain at least one value")]
    EmptyList(&'static str),

    #[error("number_of_assets values must be >= 1")]
    ZeroAssets,

    #[error("filter price must be a finite value >= 0, got {0}")]
    InvalidFilterPrice(f64),

    #[error("stake_currency must not be empty")]
    EmptyStakeCurrency,

    #[error(transparent)]
    TimeRange(#[from] TimeRangeError),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settlement currency; scopes the default whitelist and the output path
    pub stake_currency: String,
    /// Candle timeframe of the history files, e.g. "1d"
    pub timeframe: String,
    pub data_dir: String,
    pub output_dir: String,
    /// Inclusive start of the analysis window
    pub start_date: String,
    /// End of the analysis window; the last period stops here
    pub end_date: String,
    /// Slicing intervals; unknown names fall back to monthly
    pub intervals: Vec<String>,
    /// Minimum close price for volume to count
    pub filter_prices: Vec<f64>,
    /// List sizes (N) to generate
    pub number_of_assets: Vec<usize>,
    /// Explicit candidate pairs, ranked in this order on ties; empty means
    /// every pair found in `data_dir`, sorted by id
    pub pairs: Vec<String>,
    /// Whitelist patterns; empty means `.*/{stake_currency}`
    pub pair_whitelist: Vec<String>,
    pub pair_blacklist: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stake_currency: "BUSD".to_string(),
            timeframe: "1d".to_string(),
            data_dir: "user_data/data/binance".to_string(),
            output_dir: "user_data/pairlists".to_string(),
            start_date: "20180101 00:00:00".to_string(),
            end_date: "20211001 00:00:00".to_string(),
            intervals: Interval::ALL.iter().map(|i| i.to_string()).collect(),
            filter_prices: vec![0.0, 0.01, 0.02, 0.05, 0.15, 0.5],
            number_of_assets: vec![30, 45, 60, 75, 90, 105, 120],
            pairs: Vec::new(),
            pair_whitelist: Vec::new(),
            pair_blacklist: vec![
                "^(.*USD|USDC|AUD|BRZ|CAD|CHF|EUR|GBP|HKD|SGD|TRY|ZAR|TUSD)/.*".to_string(),
                "PAX/.*".to_string(),
                "DAI/.*".to_string(),
                "PAXG/.*".to_string(),
                ".*UP/USDT".to_string(),
                ".*DOWN/USDT".to_string(),
                ".*BEAR/USDT".to_string(),
                ".*BULL/USDT".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load configuration from JSON file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `path` if given, otherwise start from defaults
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let mut config = Config::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// `PAIRLIST_DATA_DIR`, `PAIRLIST_OUTPUT_DIR` and `PAIRLIST_STAKE_CURRENCY`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("PAIRLIST_DATA_DIR") {
            debug!("PAIRLIST_DATA_DIR overrides data_dir: {}", dir);
            self.data_dir = dir;
        }
        if let Ok(dir) = std::env::var("PAIRLIST_OUTPUT_DIR") {
            debug!("PAIRLIST_OUTPUT_DIR overrides output_dir: {}", dir);
            self.output_dir = dir;
        }
        if let Ok(stake) = std::env::var("PAIRLIST_STAKE_CURRENCY") {
            debug!("PAIRLIST_STAKE_CURRENCY overrides stake_currency: {}", stake);
            self.set_stake_currency(&stake);
        }
    }

    /// Switch the stake currency.
    ///
    /// A whitelist that is exactly the one derived from the old stake is
    /// cleared so it follows the new stake; any other whitelist is kept.
    pub fn set_stake_currency(&mut self, stake: &str) {
        let derived = vec![format!(".*/{}", self.stake_currency)];
        if self.pair_whitelist == derived {
            self.pair_whitelist.clear();
        }
        self.stake_currency = stake.trim().to_uppercase();
    }

    /// Analysis window parsed from `start_date` / `end_date`
    pub fn time_range(&self) -> Result<TimeRange, ConfigError> {
        Ok(TimeRange::new(
            crate::data::parse_date(&self.start_date)?,
            crate::data::parse_date(&self.end_date)?,
        ))
    }

    /// Set the window from a `START-END` timerange string
    pub fn set_time_range(&mut self, timerange: &str) -> Result<(), ConfigError> {
        let range = TimeRange::parse(timerange)?;
        self.start_date = range.start.format("%Y%m%d %H:%M:%S").to_string();
        self.end_date = range.end.format("%Y%m%d %H:%M:%S").to_string();
        Ok(())
    }

    /// Parsed intervals, unknown names falling back to monthly
    pub fn intervals(&self) -> Vec<Interval> {
        self.intervals
            .iter()
            .map(|s| Interval::parse_lenient(s))
            .collect()
    }

    /// Effective whitelist
    pub fn pair_whitelist(&self) -> Vec<String> {
        if self.pair_whitelist.is_empty() {
            vec![format!(".*/{}", self.stake_currency)]
        } else {
            self.pair_whitelist.clone()
        }
    }

    /// Check everything the generator relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stake_currency.trim().is_empty() {
            return Err(ConfigError::EmptyStakeCurrency);
        }
        if self.intervals.is_empty() {
            return Err(ConfigError::EmptyList("intervals"));
        }
        if self.filter_prices.is_empty() {
            return Err(ConfigError::EmptyList("filter_prices"));
        }
        if self.number_of_assets.is_empty() {
            return Err(ConfigError::EmptyList("number_of_assets"));
        }
        if let Some(&bad) = self
            .filter_prices
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0)
        {
            return Err(ConfigError::InvalidFilterPrice(bad));
        }
        if self.number_of_assets.contains(&0) {
            return Err(ConfigError::ZeroAssets);
        }
        self.time_range()?;
        Ok(())
    }
}

/// Parse comma-separated floats
pub fn parse_float_list(s: &str) -> Vec<f64> {
    s.split(',').filter_map(|x| x.trim().parse().ok()).collect()
}

/// Parse comma-separated integers
pub fn parse_int_list(s: &str) -> Vec<usize> {
    s.split(',').filter_map(|x| x.trim().parse().ok()).collect()
}

/// Parse comma-separated words
pub fn parse_str_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.intervals(),
            vec![Interval::Monthly, Interval::Weekly, Interval::Daily]
        );
        assert_eq!(config.pair_whitelist(), vec![".*/BUSD".to_string()]);

        let range = config.time_range().unwrap();
        assert_eq!(range.to_string(), "20180101-20211001");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"stake_currency": "USDT", "number_of_assets": [10]}"#)
                .unwrap();
        assert_eq!(config.stake_currency, "USDT");
        assert_eq!(config.number_of_assets, vec![10]);
        assert_eq!(config.timeframe, "1d");
        assert_eq!(config.pair_whitelist(), vec![".*/USDT".to_string()]);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"intervals": ["weekly", "quarterly"]}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.intervals(), vec![Interval::Weekly, Interval::Monthly]);
    }

    #[test]
    fn test_validation_errors() {
        let config = Config {
            number_of_assets: vec![10, 0],
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroAssets)));

        let config = Config {
            filter_prices: vec![-0.1],
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFilterPrice(_))
        ));

        let config = Config {
            intervals: vec![],
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyList("intervals"))));

        let config = Config {
            end_date: "not a date".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::TimeRange(_))));
    }

    #[test]
    fn test_stake_override_scopes_whitelist() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/busd_1d.json");
        let mut config = Config::from_file(path).unwrap();
        config.set_stake_currency("BUSD");
        assert_eq!(config.pair_whitelist(), vec![".*/BUSD".to_string()]);

        config.set_stake_currency(" usdt ");
        assert_eq!(config.stake_currency, "USDT");
        assert_eq!(config.pair_whitelist(), vec![".*/USDT".to_string()]);

        let mut pinned = Config {
            pair_whitelist: vec![".*/BUSD".to_string()],
            ..Config::default()
        };
        pinned.set_stake_currency("USDT");
        assert_eq!(pinned.pair_whitelist(), vec![".*/USDT".to_string()]);

        let mut custom = Config {
            pair_whitelist: vec!["(BTC|ETH)/.*".to_string()],
            ..Config::default()
        };
        custom.set_stake_currency("USDT");
        assert_eq!(custom.pair_whitelist(), vec!["(BTC|ETH)/.*".to_string()]);
    }

    #[test]
    fn test_set_time_range() {
        let mut config = Config::default();
        config.set_time_range("20210101-20210215").unwrap();
        assert_eq!(config.time_range().unwrap().to_string(), "20210101-20210215");
        assert!(config.set_time_range("garbage").is_err());
    }

    #[test]
    fn test_parse_lists() {
        assert_eq!(parse_float_list("0, 0.01,x,0.5"), vec![0.0, 0.01, 0.5]);
        assert_eq!(parse_int_list("30,45"), vec![30, 45]);
        assert_eq!(parse_str_list("monthly, ,daily"), vec!["monthly", "daily"]);
    }
}
