//! Pairlist generation over the full parameter grid
//!
//! Builds one quote-volume table per filter price and one slice set per
//! interval, then ranks every (filter price, interval, N) combination and
//! writes each result as a JSON document keyed by period label.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use itertools::{iproduct, Itertools};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::data::TimeRange;
use crate::ranker::rank_periods;
use crate::slicer::slice_periods;
use crate::volume::QuoteVolumeTable;
use crate::{Candle, Interval, PairId, PeriodSlice, RankedPairlist};

/// One point of the parameter grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairlistJob {
    pub filter_price: f64,
    pub interval: Interval,
    pub number_of_assets: usize,
}

impl PairlistJob {
    /// `{interval}_{N}_{STAKE}_{price}_minprice_{start}_{end}.json`
    pub fn file_name(&self, stake_currency: &str, range: &TimeRange) -> String {
        format!(
            "{}_{}_{}_{}_minprice_{}_{}.json",
            self.interval,
            self.number_of_assets,
            stake_currency,
            format_filter_price(self.filter_price),
            range.start_label(),
            range.end_label()
        )
    }

    /// `{output_dir}/{STAKE}/{interval}/{file_name}`
    pub fn output_path(
        &self,
        output_dir: impl AsRef<Path>,
        stake_currency: &str,
        range: &TimeRange,
    ) -> PathBuf {
        output_dir
            .as_ref()
            .join(stake_currency)
            .join(self.interval.as_str())
            .join(self.file_name(stake_currency, range))
    }
}

/// Shortest decimal form with `,` as separator: `0.05` -> `0,05`, `0` -> `0`
pub fn format_filter_price(price: f64) -> String {
    price.to_string().replace('.', ",")
}

/// A written pairlist document
#[derive(Debug, Clone)]
pub struct GeneratedPairlist {
    pub job: PairlistJob,
    pub path: PathBuf,
    /// Periods present in the document (empty periods are omitted)
    pub periods: usize,
}

struct PlannedJob {
    job: PairlistJob,
    table_idx: usize,
    slices_idx: usize,
}

/// Runs the ranking grid for one configuration
pub struct Generator {
    config: Config,
    range: TimeRange,
    filter_prices: Vec<f64>,
    intervals: Vec<Interval>,
    number_of_assets: Vec<usize>,
}

impl Generator {
    /// Validate `config` and fix the grid. Repeated grid values are dropped.
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let range = config.time_range()?;

        if range.start >= range.end {
            warn!(
                "Analysis window {} is empty, every pairlist will be empty",
                range
            );
        }

        let filter_prices = config
            .filter_prices
            .iter()
            .copied()
            .unique_by(|p| p.to_bits())
            .collect();
        let intervals = config.intervals().into_iter().unique().collect();
        let number_of_assets = config.number_of_assets.iter().copied().unique().collect();

        Ok(Generator {
            config,
            range,
            filter_prices,
            intervals,
            number_of_assets,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn time_range(&self) -> TimeRange {
        self.range
    }

    /// Every grid point, filter price outermost
    pub fn jobs(&self) -> Vec<PairlistJob> {
        iproduct!(&self.filter_prices, &self.intervals, &self.number_of_assets)
            .map(|(&filter_price, &interval, &number_of_assets)| PairlistJob {
                filter_price,
                interval,
                number_of_assets,
            })
            .collect()
    }

    /// Rank every grid point in memory
    pub fn rank_all(
        &self,
        series: &[(PairId, Vec<Candle>)],
        sequential: bool,
    ) -> Result<Vec<(PairlistJob, RankedPairlist)>> {
        self.execute(series, sequential, None, |job, pairlist| Ok((*job, pairlist)))
    }

    /// Rank every grid point and write one JSON document per job
    pub fn run(
        &self,
        series: &[(PairId, Vec<Candle>)],
        sequential: bool,
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<GeneratedPairlist>> {
        let output_dir = PathBuf::from(&self.config.output_dir);
        let stake = self.config.stake_currency.as_str();

        let written = self.execute(series, sequential, progress, |job, pairlist| {
            let path = job.output_path(&output_dir, stake, &self.range);
            write_pairlist(&path, &pairlist)?;
            debug!("Wrote {} periods to {}", pairlist.len(), path.display());
            Ok(GeneratedPairlist {
                job: *job,
                path,
                periods: pairlist.len(),
            })
        })?;

        info!(
            "Wrote {} pairlist files under {}",
            written.len(),
            output_dir.display()
        );
        Ok(written)
    }

    fn execute<T, F>(
        &self,
        series: &[(PairId, Vec<Candle>)],
        sequential: bool,
        progress: Option<&ProgressBar>,
        handle: F,
    ) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&PairlistJob, RankedPairlist) -> Result<T> + Sync,
    {
        let build_table = |price: &f64| QuoteVolumeTable::build(series, *price);
        let tables: Vec<QuoteVolumeTable> = if sequential {
            self.filter_prices.iter().map(build_table).collect()
        } else {
            self.filter_prices.par_iter().map(build_table).collect()
        };

        let slice_sets: Vec<Vec<PeriodSlice>> = self
            .intervals
            .iter()
            .map(|interval| slice_periods(self.range.start, self.range.end, *interval))
            .collect();

        let plan: Vec<PlannedJob> = iproduct!(
            self.filter_prices.iter().enumerate(),
            self.intervals.iter().enumerate(),
            &self.number_of_assets
        )
        .map(|((table_idx, &filter_price), (slices_idx, &interval), &n)| PlannedJob {
            job: PairlistJob {
                filter_price,
                interval,
                number_of_assets: n,
            },
            table_idx,
            slices_idx,
        })
        .collect();

        info!(
            "Ranking {} jobs: {} filter prices x {} intervals x {} list sizes over {}",
            plan.len(),
            self.filter_prices.len(),
            self.intervals.len(),
            self.number_of_assets.len(),
            self.range
        );

        let run_job = |planned: &PlannedJob| -> Result<T> {
            let job = &planned.job;
            let pairlist = rank_periods(
                &tables[planned.table_idx],
                &slice_sets[planned.slices_idx],
                job.number_of_assets,
            );
            let out = handle(job, pairlist);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            out
        };

        if sequential {
            plan.iter().map(run_job).collect()
        } else {
            plan.par_iter().map(run_job).collect()
        }
    }
}

/// Write a pairlist as JSON with 4-space indentation, creating parent dirs
pub fn write_pairlist(path: impl AsRef<Path>, pairlist: &RankedPairlist) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .context(format!("Failed to create directory {}", parent.display()))?;
    }

    let file = File::create(path).context(format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    pairlist
        .serialize(&mut serializer)
        .context("Failed to serialize pairlist")?;
    writer.flush()?;
    Ok(())
}
