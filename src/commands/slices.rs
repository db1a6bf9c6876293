//! Slices command: inspect the period grid and, optionally, its rankings

use anyhow::Result;
use pairlist_generator::ranker::rank_period_with_volume;
use pairlist_generator::slicer::slice_periods;
use pairlist_generator::universe::PairUniverse;
use pairlist_generator::volume::QuoteVolumeTable;
use pairlist_generator::{data, Config, Interval};
use tracing::info;

pub fn run(
    config_path: Option<String>,
    timerange: Option<String>,
    interval: String,
    top: Option<usize>,
    min_price: f64,
) -> Result<()> {
    let mut config = Config::load(config_path.as_deref())?;
    if let Some(ref timerange) = timerange {
        config.set_time_range(timerange)?;
    }

    let range = config.time_range()?;
    let interval = Interval::parse_lenient(&interval);
    let slices = slice_periods(range.start, range.end, interval);
    info!("{} {} slices in {}", slices.len(), interval, range);

    let table = match top {
        Some(0) => anyhow::bail!("--top must be >= 1"),
        Some(_) => {
            let pairs = PairUniverse::from_config(&config)?.resolve(&config, &config.data_dir)?;
            let series = data::load_pairs(&config.data_dir, &pairs, &config.timeframe)?;
            Some(QuoteVolumeTable::build(&series, min_price))
        }
        None => None,
    };

    println!("\n{}", "=".repeat(70));
    println!("{} SLICES {}", interval.as_str().to_uppercase(), range);
    println!("{}", "=".repeat(70));

    for slice in &slices {
        let days = (slice.end - slice.start).num_days();
        println!("{:<20} {:>4} days", slice.label(), days);

        if let (Some(table), Some(n)) = (&table, top) {
            let ranked = rank_period_with_volume(table, slice, n);
            if ranked.is_empty() {
                println!("    (no traded pairs)");
            }
            for (rank, (pair, volume)) in ranked.iter().enumerate() {
                println!("    {:>3}. {:<16} {:>20.2}", rank + 1, pair, volume);
            }
        }
    }
    println!("{}", "=".repeat(70));

    Ok(())
}
