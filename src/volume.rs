//! Quote-volume table
//!
//! Wide table of `volume * close` per pair, outer-joined on timestamp. The
//! minimum-price filter is applied while building, so a table is tied to
//! exactly one filter price.

use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;
use tracing::{debug, warn};

use crate::{Candle, PairId, PeriodSlice};

/// Timestamp-indexed quote volume, one column per pair.
///
/// Timestamps are naive UTC, unique and ascending. Cells for which a pair has
/// no candle are `None` and sum as zero.
#[derive(Debug, Clone, Default)]
pub struct QuoteVolumeTable {
    filter_price: f64,
    timestamps: Vec<NaiveDateTime>,
    pairs: Vec<PairId>,
    columns: Vec<Vec<Option<f64>>>,
}

impl QuoteVolumeTable {
    /// Build the table from per-pair candle series.
    ///
    /// Column order follows `series`. Pairs without candles get no column;
    /// a repeated pair id keeps its first series.
    pub fn build(series: &[(PairId, Vec<Candle>)], filter_price: f64) -> Self {
        let mut seen: HashSet<&PairId> = HashSet::new();
        let mut accepted: Vec<(&PairId, &[Candle])> = Vec::with_capacity(series.len());

        for (pair, candles) in series {
            if candles.is_empty() {
                debug!("{} has no candles, skipping", pair);
                continue;
            }
            if !seen.insert(pair) {
                warn!("Duplicate series for {}, keeping the first one", pair);
                continue;
            }
            accepted.push((pair, candles.as_slice()));
        }

        let timestamps: Vec<NaiveDateTime> = accepted
            .iter()
            .flat_map(|(_, candles)| candles.iter().map(|c| c.datetime.naive_utc()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut pairs = Vec::with_capacity(accepted.len());
        let mut columns = Vec::with_capacity(accepted.len());

        for (pair, candles) in accepted {
            let mut column = vec![None; timestamps.len()];
            for candle in candles {
                // every candle timestamp is in the union, so the search always hits
                if let Ok(row) = timestamps.binary_search(&candle.datetime.naive_utc()) {
                    column[row] = Some(candle.quote_volume(filter_price));
                }
            }
            pairs.push(pair.clone());
            columns.push(column);
        }

        debug!(
            "Built quote volume table: {} rows x {} pairs (min price {})",
            timestamps.len(),
            pairs.len(),
            filter_price
        );

        QuoteVolumeTable {
            filter_price,
            timestamps,
            pairs,
            columns,
        }
    }

    pub fn filter_price(&self) -> f64 {
        self.filter_price
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Pair columns in input order
    pub fn pairs(&self) -> &[PairId] {
        &self.pairs
    }

    pub fn num_rows(&self) -> usize {
        self.timestamps.len()
    }

    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty() || self.pairs.is_empty()
    }

    /// Cell value, `None` when the pair has no candle at that row
    pub fn value(&self, row: usize, pair_idx: usize) -> Option<f64> {
        self.columns.get(pair_idx)?.get(row).copied().flatten()
    }

    /// Row indices whose timestamp lies in `[slice.start, slice.end)`
    pub fn row_range(&self, slice: &PeriodSlice) -> Range<usize> {
        let lo = self.timestamps.partition_point(|ts| *ts < slice.start);
        let hi = self.timestamps.partition_point(|ts| *ts < slice.end);
        lo..hi.max(lo)
    }

    /// Summed quote volume per pair over one slice, in column order
    pub fn period_sums(&self, slice: &PeriodSlice) -> Vec<(&PairId, f64)> {
        let rows = self.row_range(slice);
        self.pairs
            .iter()
            .zip(&self.columns)
            .map(|(pair, column)| {
                let sum: f64 = column[rows.clone()].iter().flatten().sum();
                (pair, sum)
            })
            .collect()
    }
}
