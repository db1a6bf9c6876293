//! Data loading and management
//!
//! Reads per-pair OHLCV history from CSV files laid out as
//! `{data_dir}/{BASE}_{QUOTE}_{timeframe}.csv` and parses the date and
//! timerange formats used on the command line and in configs.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{Candle, PairId, DATE_FORMAT};

// =============================================================================
// Date Parsing
// =============================================================================

/// Errors for analysis window parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeRangeError {
    #[error("invalid date '{0}': use YYYYMMDD, YYYY-MM-DD or YYYY-MM-DD HH:MM:SS")]
    InvalidDate(String),

    #[error("invalid timerange '{0}': expected START-END, e.g. 20210101-20211001")]
    InvalidFormat(String),
}

/// Parse a date string to naive UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYYMMDD HH:MM:SS`,
/// `YYYY-MM-DD` and `YYYYMMDD`. Date-only inputs mean midnight.
pub fn parse_date(date_str: &str) -> Result<NaiveDateTime, TimeRangeError> {
    let s = date_str.trim();

    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Ok(dt.naive_utc());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y%m%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ndt);
        }
    }

    for fmt in ["%Y-%m-%d", DATE_FORMAT] {
        if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(nd.and_time(chrono::NaiveTime::MIN));
        }
    }

    Err(TimeRangeError::InvalidDate(date_str.to_string()))
}

/// Analysis window `[start, end)` in naive UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Parse a backtest-style timerange such as `20210101-20211001`
    pub fn parse(s: &str) -> Result<Self, TimeRangeError> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .filter(|(a, b)| !a.is_empty() && !b.is_empty())
            .ok_or_else(|| TimeRangeError::InvalidFormat(s.to_string()))?;

        Ok(Self {
            start: parse_date(start)?,
            end: parse_date(end)?,
        })
    }

    /// `YYYYMMDD` of the start, as used in output file names
    pub fn start_label(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    /// `YYYYMMDD` of the end, as used in output file names
    pub fn end_label(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start_label(), self.end_label())
    }
}

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Path of a pair's history file
pub fn pair_data_path(data_dir: impl AsRef<Path>, pair: &PairId, timeframe: &str) -> PathBuf {
    data_dir
        .as_ref()
        .join(format!("{}_{}.csv", pair.file_stem(), timeframe))
}

/// Load OHLCV data from CSV file with validation
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).context("Failed to open CSV file")?;

    let mut candles = Vec::new();
    let mut invalid_count = 0;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let dt_str = record.get(0).context("Missing datetime column")?;
        let datetime = parse_date(dt_str)
            .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
            .context(format!("Failed to parse datetime: {}", dt_str))?;

        let field = |idx: usize, name: &str| -> Result<f64> {
            record
                .get(idx)
                .context(format!("Missing {} column", name))?
                .trim()
                .parse()
                .context(format!("Failed to parse {}", name))
        };

        let open = field(1, "open")?;
        let high = field(2, "high")?;
        let low = field(3, "low")?;
        let close = field(4, "close")?;
        let volume = field(5, "volume")?;

        match Candle::new(datetime, open, high, low, close, volume) {
            Ok(candle) => candles.push(candle),
            Err(e) => {
                invalid_count += 1;
                warn!(
                    "Skipping invalid candle at row {} in {:?}: {}",
                    row_idx + 2, // +2 for 1-indexed and header row
                    path.file_name().unwrap_or_default(),
                    e
                );
            }
        }
    }

    if invalid_count > 0 {
        warn!(
            "Skipped {} invalid candles out of {} in {:?}",
            invalid_count,
            invalid_count + candles.len(),
            path.file_name().unwrap_or_default()
        );
    }

    Ok(candles)
}

/// Load one pair's history; a missing file is an empty series
pub fn load_pair_history(
    data_dir: impl AsRef<Path>,
    pair: &PairId,
    timeframe: &str,
) -> Result<Vec<Candle>> {
    let path = pair_data_path(data_dir, pair, timeframe);

    if !path.exists() {
        warn!("Data file not found: {}", path.display());
        return Ok(Vec::new());
    }

    let candles = load_csv(&path).context(format!("Failed to load data for {}", pair))?;
    debug!("Loaded {} candles for {}", candles.len(), pair);
    Ok(candles)
}

/// Load history for every pair, keeping the order of `pairs`
pub fn load_pairs(
    data_dir: impl AsRef<Path>,
    pairs: &[PairId],
    timeframe: &str,
) -> Result<Vec<(PairId, Vec<Candle>)>> {
    let data_dir = data_dir.as_ref();
    let mut data = Vec::with_capacity(pairs.len());

    for pair in pairs {
        let candles = load_pair_history(data_dir, pair, timeframe)?;
        data.push((pair.clone(), candles));
    }

    let loaded = data.iter().filter(|(_, c)| !c.is_empty()).count();
    if loaded == 0 {
        warn!("No candle data loaded for any of {} pairs", pairs.len());
    } else {
        info!(
            "Loaded {} candle series ({} pairs without data) from {}",
            loaded,
            pairs.len() - loaded,
            data_dir.display()
        );
    }

    Ok(data)
}

/// Pairs with a history file for `timeframe` in `data_dir`, sorted
pub fn discover_pairs(data_dir: impl AsRef<Path>, timeframe: &str) -> Result<Vec<PairId>> {
    let data_dir = data_dir.as_ref();
    let suffix = format!("_{}.csv", timeframe);

    let entries = std::fs::read_dir(data_dir)
        .context(format!("Failed to read data directory {}", data_dir.display()))?;

    let mut pairs = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(stem) = name.strip_suffix(&suffix) {
            if !stem.is_empty() {
                pairs.push(PairId::from_file_stem(stem));
            }
        }
    }

    pairs.sort();
    debug!("Discovered {} pairs in {}", pairs.len(), data_dir.display());
    Ok(pairs)
}

/// Save candles to CSV file in the layout `load_csv` reads
pub fn save_csv(path: impl AsRef<Path>, candles: &[Candle]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path).context("Failed to create output file")?;

    writeln!(file, "datetime,open,high,low,close,volume")?;

    for candle in candles {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            candle.datetime.format("%Y-%m-%d %H:%M:%S"),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume
        )?;
    }

    debug!("Saved {} rows to {}", candles.len(), path.display());
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
