//! Period slicing
//!
//! Splits an analysis window into consecutive calendar periods. Months are
//! added with calendar semantics (Jan 31 + 1 month = Feb 28), so a monthly
//! walk drifts onto the clamped day the way a human calendar would.

use chrono::{Days, Months, NaiveDateTime};
use tracing::debug;

use crate::{Interval, PeriodSlice};

/// Advance `ts` by one calendar unit of `interval`.
///
/// Returns `None` only when the result would overflow the representable
/// date range.
pub fn add_interval(ts: NaiveDateTime, interval: Interval) -> Option<NaiveDateTime> {
    match interval {
        Interval::Monthly => ts.checked_add_months(Months::new(1)),
        Interval::Weekly => ts.checked_add_days(Days::new(7)),
        Interval::Daily => ts.checked_add_days(Days::new(1)),
    }
}

/// Partition `[start, end)` into consecutive slices of one `interval` each.
///
/// The last slice is truncated so it ends exactly at `end`. An empty or
/// inverted window yields no slices.
pub fn slice_periods(
    start: NaiveDateTime,
    end: NaiveDateTime,
    interval: Interval,
) -> Vec<PeriodSlice> {
    let mut slices = Vec::new();
    let mut current = start;

    while current < end {
        match add_interval(current, interval) {
            Some(next) if next <= end => {
                slices.push(PeriodSlice::new(current, next));
                current = next;
            }
            _ => {
                slices.push(PeriodSlice::new(current, end));
                break;
            }
        }
    }

    debug!(
        "Sliced {} .. {} into {} {} periods",
        start,
        end,
        slices.len(),
        interval
    );

    slices
}
