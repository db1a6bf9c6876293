//! Per-period volume ranking

use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use tracing::debug;

use crate::volume::QuoteVolumeTable;
use crate::{PairId, PeriodSlice, RankedPairlist};

/// Top `n` pairs of one period together with their summed quote volume.
///
/// Pairs with a non-positive sum are dropped. The sort is stable, so equal
/// sums keep the table's column order.
pub fn rank_period_with_volume(
    table: &QuoteVolumeTable,
    slice: &PeriodSlice,
    n: usize,
) -> Vec<(PairId, f64)> {
    let mut ranked: Vec<(&PairId, f64)> = table
        .period_sums(slice)
        .into_iter()
        .filter(|(_, sum)| *sum > 0.0)
        .collect();

    ranked.sort_by_key(|(_, sum)| Reverse(OrderedFloat(*sum)));

    ranked
        .into_iter()
        .take(n)
        .map(|(pair, sum)| (pair.clone(), sum))
        .collect()
}

/// Top `n` pairs of one period by quote volume
pub fn rank_period(table: &QuoteVolumeTable, slice: &PeriodSlice, n: usize) -> Vec<PairId> {
    rank_period_with_volume(table, slice, n)
        .into_iter()
        .map(|(pair, _)| pair)
        .collect()
}

/// Rank every slice; periods where no pair traded are left out of the map
pub fn rank_periods(
    table: &QuoteVolumeTable,
    slices: &[PeriodSlice],
    n: usize,
) -> RankedPairlist {
    let mut result = RankedPairlist::new();

    for slice in slices {
        let pairs = rank_period(table, slice, n);
        if pairs.is_empty() {
            debug!("No traded pairs in {}, omitting period", slice);
            continue;
        }
        result.insert(slice.label(), pairs);
    }

    result
}
