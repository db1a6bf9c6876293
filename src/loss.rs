//! Hyperopt loss scoring
//!
//! Scores a set of closed trades the optimizer already produced; lower is
//! better. Two scorers are provided: a daily Sortino loss and the composite
//! "genius" loss that blends total profit, win/loss ratio, average profit and
//! the Sortino term.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::data::parse_date;

/// One closed trade as reported by the backtester
#[derive(Debug, Clone, PartialEq)]
pub struct TradeResult {
    pub close_date: DateTime<Utc>,
    pub profit_ratio: f64,
}

impl TradeResult {
    pub fn new(close_date: DateTime<Utc>, profit_ratio: f64) -> Self {
        Self {
            close_date,
            profit_ratio,
        }
    }
}

/// Objective function over a finished backtest; smaller is better
pub trait ResultScorer {
    fn name(&self) -> &'static str;

    fn score(
        &self,
        trades: &[TradeResult],
        min_date: DateTime<Utc>,
        max_date: DateTime<Utc>,
    ) -> f64;
}

// =============================================================================
// Sortino
// =============================================================================

/// Daily Sortino ratio settings
#[derive(Debug, Clone)]
pub struct SortinoSettings {
    /// Subtracted from every trade's profit ratio
    pub slippage_per_trade: f64,
    pub days_in_year: f64,
    pub minimum_acceptable_return: f64,
    /// Ratio reported when there is no downside deviation
    pub no_downside_ratio: f64,
}

impl Default for SortinoSettings {
    fn default() -> Self {
        SortinoSettings {
            slippage_per_trade: 0.0005,
            days_in_year: 365.0,
            minimum_acceptable_return: 0.0,
            no_downside_ratio: -20.0,
        }
    }
}

/// Negated annualised Sortino ratio of daily summed returns.
///
/// Days run from `min_date` to `max_date` inclusive; days without closed
/// trades count as zero return and trades outside the window are ignored.
/// Without downside deviation (including an empty window) the ratio is
/// `no_downside_ratio`, which makes the loss clearly non-optimal.
pub fn sortino_daily(
    trades: &[TradeResult],
    min_date: DateTime<Utc>,
    max_date: DateTime<Utc>,
    settings: &SortinoSettings,
) -> f64 {
    let first_day = min_date.date_naive();
    let last_day = max_date.date_naive();

    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for trade in trades {
        *daily.entry(trade.close_date.date_naive()).or_insert(0.0) +=
            trade.profit_ratio - settings.slippage_per_trade;
    }

    let excess: Vec<f64> = first_day
        .iter_days()
        .take_while(|day| *day <= last_day)
        .map(|day| daily.get(&day).copied().unwrap_or(0.0) - settings.minimum_acceptable_return)
        .collect();

    let days = excess.len() as f64;
    let down_stdev = if excess.is_empty() {
        0.0
    } else {
        (excess.iter().map(|r| r.min(0.0).powi(2)).sum::<f64>() / days).sqrt()
    };

    let sortino_ratio = if down_stdev != 0.0 {
        let mean = excess.iter().sum::<f64>() / days;
        mean / down_stdev * settings.days_in_year.sqrt()
    } else {
        settings.no_downside_ratio
    };

    debug!(
        "Sortino over {} days: downside stdev {:.6}, ratio {:.4}",
        excess.len(),
        down_stdev,
        sortino_ratio
    );

    -sortino_ratio
}

/// Scorer returning the negated daily Sortino ratio
#[derive(Debug, Clone, Default)]
pub struct SortinoDailyLoss {
    pub settings: SortinoSettings,
}

impl ResultScorer for SortinoDailyLoss {
    fn name(&self) -> &'static str {
        "SortinoDaily"
    }

    fn score(
        &self,
        trades: &[TradeResult],
        min_date: DateTime<Utc>,
        max_date: DateTime<Utc>,
    ) -> f64 {
        sortino_daily(trades, min_date, max_date, &self.settings)
    }
}

// =============================================================================
// Genius loss
// =============================================================================

/// Weights of the composite loss
#[derive(Debug, Clone)]
pub struct GeniusLossSettings {
    pub expected_max_profit: f64,
    pub win_loss_weight: f64,
    pub average_profit_weight: f64,
    pub sortino_weight: f64,
    /// Only count wins above `small_profits_threshold`
    pub ignore_small_profits: bool,
    pub small_profits_threshold: f64,
    pub sortino: SortinoSettings,
}

impl Default for GeniusLossSettings {
    fn default() -> Self {
        GeniusLossSettings {
            expected_max_profit: 3.0,
            win_loss_weight: 5.0,
            average_profit_weight: 15.0,
            sortino_weight: 0.01,
            ignore_small_profits: false,
            small_profits_threshold: 0.001,
            sortino: SortinoSettings::default(),
        }
    }
}

/// Composite loss over profit, win/loss ratio, average profit and Sortino
#[derive(Debug, Clone, Default)]
pub struct GeniusLoss {
    pub settings: GeniusLossSettings,
}

impl GeniusLoss {
    pub fn new(settings: GeniusLossSettings) -> Self {
        Self { settings }
    }
}

impl ResultScorer for GeniusLoss {
    fn name(&self) -> &'static str {
        "GeniusLoss"
    }

    fn score(
        &self,
        trades: &[TradeResult],
        min_date: DateTime<Utc>,
        max_date: DateTime<Utc>,
    ) -> f64 {
        let s = &self.settings;
        let profit_threshold = if s.ignore_small_profits {
            s.small_profits_threshold
        } else {
            0.0
        };

        let total_profit: f64 = trades.iter().map(|t| t.profit_ratio).sum();
        let total_win = trades
            .iter()
            .filter(|t| t.profit_ratio > profit_threshold)
            .count();
        // at least one loss so the ratio stays finite
        let total_lose = trades
            .iter()
            .filter(|t| t.profit_ratio <= 0.0)
            .count()
            .max(1);
        let average_profit = if trades.is_empty() {
            0.0
        } else {
            total_profit / trades.len() as f64 * 100.0
        };
        let sortino = sortino_daily(trades, min_date, max_date, &s.sortino);

        let profit_loss = 1.0 - total_profit / s.expected_max_profit;
        let win_lose_loss = (1.0 - total_win as f64 / total_lose as f64) * s.win_loss_weight;
        let average_profit_loss = 1.0 - average_profit * s.average_profit_weight;
        let sortino_loss = s.sortino_weight * sortino;

        debug!(
            "GeniusLoss: profit {:.4}, win/lose {:.4}, avg {:.4}, sortino {:.4}",
            profit_loss, win_lose_loss, average_profit_loss, sortino_loss
        );

        profit_loss + win_lose_loss + average_profit_loss + sortino_loss
    }
}

// =============================================================================
// Trade log loading
// =============================================================================

#[derive(Debug, Deserialize)]
struct TradeLogRow {
    close_date: String,
    profit_ratio: f64,
}

/// Load closed trades from a CSV with `close_date` and `profit_ratio` columns.
/// Other columns are ignored.
pub fn load_trade_log(path: impl AsRef<Path>) -> Result<Vec<TradeResult>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .context(format!("Failed to open trade log {}", path.display()))?;

    let mut trades = Vec::new();
    for (row_idx, row) in reader.deserialize::<TradeLogRow>().enumerate() {
        let row = row.context(format!("Failed to read trade row {}", row_idx + 1))?;
        let close_date = parse_date(&row.close_date)
            .context(format!("Failed to parse close_date: {}", row.close_date))?;
        trades.push(TradeResult::new(
            DateTime::<Utc>::from_naive_utc_and_offset(close_date, Utc),
            row.profit_ratio,
        ));
    }

    debug!("Loaded {} trades from {}", trades.len(), path.display());
    Ok(trades)
}

/// Earliest and latest close date, `None` for an empty log
pub fn trade_date_bounds(trades: &[TradeResult]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let min = trades.iter().map(|t| t.close_date).min()?;
    let max = trades.iter().map(|t| t.close_date).max()?;
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_sortino_without_downside_uses_fallback() {
        let trades = vec![TradeResult::new(day(1), 0.1)];
        let loss = sortino_daily(&trades, day(1), day(1), &SortinoSettings::default());
        assert_eq!(loss, 20.0);
    }

    #[test]
    fn test_sortino_with_downside() {
        let trades = vec![TradeResult::new(day(1), 0.01), TradeResult::new(day(2), -0.02)];
        let loss = sortino_daily(&trades, day(1), day(2), &SortinoSettings::default());
        assert_relative_eq!(loss, 7.24886911937411, epsilon = 1e-9);
    }

    #[test]
    fn test_sortino_empty_window() {
        let loss = sortino_daily(&[], day(5), day(1), &SortinoSettings::default());
        assert_eq!(loss, 20.0);
    }

    #[test]
    fn test_sortino_ignores_trades_outside_window() {
        let inside = vec![TradeResult::new(day(1), 0.01), TradeResult::new(day(2), -0.02)];
        let mut with_outside = inside.clone();
        with_outside.push(TradeResult::new(day(20), -0.5));

        let settings = SortinoSettings::default();
        assert_relative_eq!(
            sortino_daily(&inside, day(1), day(2), &settings),
            sortino_daily(&with_outside, day(1), day(2), &settings)
        );
    }

    #[test]
    fn test_genius_loss_all_winning() {
        let trades = vec![TradeResult::new(day(1), 0.1), TradeResult::new(day(1), 0.1)];
        let loss = GeniusLoss::default().score(&trades, day(1), day(1));
        assert_relative_eq!(loss, -152.86666666666667, epsilon = 1e-9);
    }

    #[test]
    fn test_genius_loss_mixed() {
        let trades = vec![TradeResult::new(day(1), 0.01), TradeResult::new(day(2), -0.02)];
        let loss = GeniusLoss::default().score(&trades, day(1), day(2));
        assert_relative_eq!(loss, 9.575822024527074, epsilon = 1e-9);
    }

    #[test]
    fn test_small_profit_threshold() {
        let trades = vec![TradeResult::new(day(1), 0.0005), TradeResult::new(day(1), 0.05)];
        let strict = GeniusLoss::new(GeniusLossSettings {
            ignore_small_profits: true,
            ..Default::default()
        });
        let lenient = GeniusLoss::default();

        // one fewer win costs exactly one win_loss_weight
        let diff = strict.score(&trades, day(1), day(1)) - lenient.score(&trades, day(1), day(1));
        assert_relative_eq!(diff, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_load_trade_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        std::fs::write(
            &path,
            "pair,close_date,profit_ratio\n\
             BTC/BUSD,2021-01-01 12:00:00,0.05\n\
             ETH/BUSD,2021-01-03,-0.01\n",
        )
        .unwrap();

        let trades = load_trade_log(&path).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].close_date, day(1));
        assert_eq!(trades[1].profit_ratio, -0.01);

        let (min, max) = trade_date_bounds(&trades).unwrap();
        assert_eq!(min, day(1));
        assert_eq!(max, Utc.with_ymd_and_hms(2021, 1, 3, 0, 0, 0).unwrap());
    }
}
