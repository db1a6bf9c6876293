use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use proptest::prelude::*;

use pairlist_generator::ranker::{rank_period, rank_period_with_volume};
use pairlist_generator::slicer::slice_periods;
use pairlist_generator::volume::QuoteVolumeTable;
use pairlist_generator::{Candle, Interval, PairId, PeriodSlice};

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn interval_strategy() -> impl Strategy<Value = Interval> {
    prop_oneof![
        Just(Interval::Monthly),
        Just(Interval::Weekly),
        Just(Interval::Daily),
    ]
}

/// Per pair: (offset in days of first candle, closes, volumes) over 40 days
fn universe_strategy() -> impl Strategy<Value = Vec<(usize, Vec<(f64, f64)>)>> {
    prop::collection::vec(
        (
            0usize..10,
            prop::collection::vec((0.001f64..5.0, 0.0f64..1_000.0), 0..30),
        ),
        1..8,
    )
}

fn build_series(spec: &[(usize, Vec<(f64, f64)>)]) -> Vec<(PairId, Vec<Candle>)> {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    spec.iter()
        .enumerate()
        .map(|(i, (offset, rows))| {
            let candles = rows
                .iter()
                .enumerate()
                .map(|(d, &(close, volume))| Candle {
                    datetime: start + Duration::days((offset + d) as i64),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume,
                })
                .collect();
            (PairId::new(format!("P{}/BUSD", i)), candles)
        })
        .collect()
}

fn whole_window() -> PeriodSlice {
    PeriodSlice::new(base(), base() + Duration::days(60))
}

proptest! {
    /// Slices tile the window exactly, in order, ending at the window end.
    #[test]
    fn slices_cover_window(
        start_offset in 0i64..2_000,
        length_hours in 1i64..(24 * 800),
        interval in interval_strategy(),
    ) {
        let start = base() + Duration::days(start_offset);
        let end = start + Duration::hours(length_hours);
        let slices = slice_periods(start, end, interval);

        prop_assert!(!slices.is_empty());
        prop_assert_eq!(slices[0].start, start);
        prop_assert_eq!(slices.last().unwrap().end, end);
        for s in &slices {
            prop_assert!(s.start < s.end);
        }
        for w in slices.windows(2) {
            prop_assert_eq!(w[0].end, w[1].start);
        }
    }

    /// Never more than N; exactly the positive-sum count when that is smaller.
    #[test]
    fn ranking_truncates_to_n(spec in universe_strategy(), n in 1usize..10) {
        let series = build_series(&spec);
        let table = QuoteVolumeTable::build(&series, 0.0);
        let slice = whole_window();

        let positive = table.period_sums(&slice).iter().filter(|(_, s)| *s > 0.0).count();
        let ranked = rank_period(&table, &slice, n);
        prop_assert_eq!(ranked.len(), positive.min(n));
    }

    /// Sums are non-increasing, non-positive pairs never appear, and equal
    /// sums keep input order.
    #[test]
    fn ranking_is_sorted_and_stable(spec in universe_strategy()) {
        let series = build_series(&spec);
        let table = QuoteVolumeTable::build(&series, 0.0);
        let ranked = rank_period_with_volume(&table, &whole_window(), usize::MAX);

        let position = |p: &PairId| table.pairs().iter().position(|q| q == p).unwrap();
        for (_, volume) in &ranked {
            prop_assert!(*volume > 0.0);
        }
        for w in ranked.windows(2) {
            prop_assert!(w[0].1 >= w[1].1);
            if w[0].1 == w[1].1 {
                prop_assert!(position(&w[0].0) < position(&w[1].0));
            }
        }
    }

    /// Raising the filter price never raises a period sum and never lists a
    /// pair the lower price would not have listed.
    #[test]
    fn higher_filter_price_only_removes(
        spec in universe_strategy(),
        low in 0.0f64..2.0,
        bump in 0.0f64..3.0,
        n in 1usize..8,
    ) {
        let series = build_series(&spec);
        let slice = whole_window();
        let low_table = QuoteVolumeTable::build(&series, low);
        let high_table = QuoteVolumeTable::build(&series, low + bump);

        let low_sums = low_table.period_sums(&slice);
        let high_sums = high_table.period_sums(&slice);
        for ((_, lo), (_, hi)) in low_sums.iter().zip(&high_sums) {
            prop_assert!(hi <= lo);
        }

        let all_low = rank_period(&low_table, &slice, usize::MAX);
        let ranked_high = rank_period(&high_table, &slice, n);
        for pair in &ranked_high {
            prop_assert!(all_low.contains(pair));
        }
    }

    /// A pair with zero volume for the whole period is never listed.
    #[test]
    fn zero_volume_pair_never_listed(spec in universe_strategy(), n in 1usize..10) {
        let mut series = build_series(&spec);
        let dead_start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        series.push((
            PairId::new("DEAD/BUSD"),
            (0..40)
                .map(|d| Candle {
                    datetime: dead_start + Duration::days(d),
                    open: 1.0,
                    high: 1.0,
                    low: 1.0,
                    close: 1.0,
                    volume: 0.0,
                })
                .collect(),
        ));
        let table = QuoteVolumeTable::build(&series, 0.0);
        let ranked = rank_period(&table, &whole_window(), n);
        prop_assert!(!ranked.contains(&PairId::new("DEAD/BUSD")));
    }
}
