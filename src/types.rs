//! Core data types shared by the slicer, volume table, ranker and generator

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Date format used in period labels and output file names
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Validation errors for candle data
#[derive(Debug, Error)]
pub enum CandleValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("non-finite field: o={open} h={high} l={low} c={close} v={volume}")]
    NonFinite {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    },
}

/// OHLCV candlestick data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Create a new candle with validation
    pub fn new(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        let candle = Self {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        };
        candle.validate()?;
        Ok(candle)
    }

    /// Validate the candle data
    ///
    /// Open is not range-checked: exchange daily candles regularly gap at the
    /// session boundary and the ranking only reads close and volume.
    pub fn validate(&self) -> Result<(), CandleValidationError> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(CandleValidationError::NonFinite {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
                volume: self.volume,
            });
        }

        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(CandleValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(CandleValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < 0.0 {
            return Err(CandleValidationError::NegativeVolume(self.volume));
        }

        if self.close < self.low || self.close > self.high {
            return Err(CandleValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    /// Quote volume of this candle with the minimum-price filter applied.
    ///
    /// A close below `filter_price` counts as zero so the candle adds no
    /// liquidity; the candle itself is left untouched.
    pub fn quote_volume(&self, filter_price: f64) -> f64 {
        let close = if self.close < filter_price {
            0.0
        } else {
            self.close
        };
        self.volume * close
    }
}

/// Trading pair identifier (`BASE/QUOTE`) using Arc<str> for cheap cloning
///
/// Pair ids are cloned into every ranked list of every job, so an Arc keeps
/// those clones allocation-free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairId(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

/// Custom serde for Arc<str>
mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl PairId {
    pub fn new(s: impl AsRef<str>) -> Self {
        PairId(std::sync::Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base asset (`BTC` for `BTC/BUSD`); the whole id when there is no quote
    pub fn base(&self) -> &str {
        self.0.split_once('/').map_or(&self.0, |(base, _)| base)
    }

    /// Quote (stake) currency, if the id carries one
    pub fn quote(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, quote)| quote)
    }

    /// File-system safe stem: `BTC/BUSD` -> `BTC_BUSD`
    pub fn file_stem(&self) -> String {
        self.0.replace('/', "_")
    }

    /// Inverse of [`PairId::file_stem`]: only the first `_` becomes the separator
    pub fn from_file_stem(stem: &str) -> Self {
        match stem.split_once('_') {
            Some((base, quote)) => PairId::new(format!("{}/{}", base, quote)),
            None => PairId::new(stem),
        }
    }
}

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PairId {
    fn from(s: &str) -> Self {
        PairId::new(s)
    }
}

/// Unrecognised interval name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown interval '{0}' (expected monthly, weekly or daily)")]
pub struct UnknownIntervalError(pub String);

/// Nominal length of one period slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Monthly,
    Weekly,
    Daily,
}

impl Interval {
    pub const ALL: [Interval; 3] = [Interval::Monthly, Interval::Weekly, Interval::Daily];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Monthly => "monthly",
            Interval::Weekly => "weekly",
            Interval::Daily => "daily",
        }
    }

    /// Parse an interval name, falling back to monthly for anything unknown
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|e: UnknownIntervalError| {
            tracing::warn!("{}, falling back to monthly", e);
            Interval::Monthly
        })
    }
}

impl FromStr for Interval {
    type Err = UnknownIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Interval::Monthly),
            "weekly" => Ok(Interval::Weekly),
            "daily" => Ok(Interval::Daily),
            other => Err(UnknownIntervalError(other.to_string())),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open time interval `[start, end)` in naive UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodSlice {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PeriodSlice {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts < self.end
    }

    /// `YYYYMMDD-YYYYMMDD`, directly usable as a backtest timerange
    pub fn label(&self) -> String {
        format!(
            "{}-{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

impl std::fmt::Display for PeriodSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Period label -> pairs ranked by quote volume.
///
/// Labels start with a `%Y%m%d` date, so the BTreeMap iterates them
/// chronologically.
pub type RankedPairlist = BTreeMap<String, Vec<PairId>>;
