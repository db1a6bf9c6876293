//! Generate command implementation with progress tracking

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pairlist_generator::config::{parse_float_list, parse_int_list, parse_str_list};
use pairlist_generator::generator::Generator;
use pairlist_generator::universe::PairUniverse;
use pairlist_generator::{data, Config};
use std::collections::BTreeMap;
use tracing::info;

/// Command-line overrides for the generate command
#[derive(Debug, Default)]
pub struct GenerateArgs {
    pub config: Option<String>,
    pub timerange: Option<String>,
    pub data_dir: Option<String>,
    pub output: Option<String>,
    pub stake: Option<String>,
    pub timeframe: Option<String>,
    pub min_prices: Option<String>,
    pub intervals: Option<String>,
    pub number_assets: Option<String>,
    pub pairs: Option<String>,
    pub sequential: bool,
}

fn apply_overrides(config: &mut Config, args: &GenerateArgs) -> Result<()> {
    if let Some(ref timerange) = args.timerange {
        info!("Overriding timerange to: {}", timerange);
        config.set_time_range(timerange)?;
    }
    if let Some(ref dir) = args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(ref dir) = args.output {
        config.output_dir = dir.clone();
    }
    if let Some(ref stake) = args.stake {
        config.set_stake_currency(stake);
    }
    if let Some(ref timeframe) = args.timeframe {
        config.timeframe = timeframe.clone();
    }
    if let Some(ref prices) = args.min_prices {
        config.filter_prices = parse_float_list(prices);
    }
    if let Some(ref intervals) = args.intervals {
        config.intervals = parse_str_list(intervals);
    }
    if let Some(ref sizes) = args.number_assets {
        config.number_of_assets = parse_int_list(sizes);
    }
    if let Some(ref pairs) = args.pairs {
        config.pairs = parse_str_list(pairs)
            .into_iter()
            .map(|p| p.to_uppercase())
            .collect();
    }
    Ok(())
}

pub fn run(args: GenerateArgs) -> Result<()> {
    info!("Starting pairlist generation");

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(ref path) = args.config {
        info!("Loaded configuration from: {}", path);
    }
    apply_overrides(&mut config, &args)?;

    let universe = PairUniverse::from_config(&config)?;
    let pairs = universe
        .resolve(&config, &config.data_dir)
        .context("Failed to resolve pair universe")?;
    println!(
        "Found {} {} pairs in {}",
        pairs.len(),
        config.stake_currency,
        config.data_dir
    );

    let series = data::load_pairs(&config.data_dir, &pairs, &config.timeframe)?;
    let generator = Generator::new(config)?;
    let jobs = generator.jobs();
    let cfg = generator.config();

    println!("\n{}", "=".repeat(70));
    println!("PAIRLIST GENERATION");
    println!("{}", "=".repeat(70));
    println!("  Window:         {}", generator.time_range());
    println!("  Stake currency: {}", cfg.stake_currency);
    println!("  Pairs:          {}", pairs.len());
    println!("  Filter prices:  {:?}", cfg.filter_prices);
    println!("  Intervals:      {:?}", cfg.intervals);
    println!("  List sizes:     {:?}", cfg.number_of_assets);
    println!("  Total jobs:     {}", jobs.len());
    println!(
        "  Mode:           {}",
        if args.sequential { "sequential" } else { "parallel" }
    );
    println!("{}\n", "=".repeat(70));

    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}, {per_sec:.2}] {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("█░ "),
    );

    let written = generator.run(&series, args.sequential, Some(&pb))?;
    pb.finish_with_message(format!("{} files", written.len()));
    println!();

    // files and longest document per interval
    let mut per_interval: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for item in &written {
        let entry = per_interval.entry(item.job.interval.as_str()).or_default();
        entry.0 += 1;
        entry.1 = entry.1.max(item.periods);
    }

    println!("{}", "=".repeat(70));
    println!("{:<10} {:>8} {:>14}", "Interval", "Files", "Max periods");
    println!("{}", "-".repeat(70));
    for (interval, (files, periods)) in &per_interval {
        println!("{:<10} {:>8} {:>14}", interval, files, periods);
    }
    println!("{}", "=".repeat(70));
    println!("Output directory: {}", cfg.output_dir);

    info!("Pairlist generation completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairlist_generator::config::ConfigError;
    use pairlist_generator::PairId;

    #[test]
    fn test_overrides_normalise_stake_and_pairs() {
        let mut config = Config::default();
        let args = GenerateArgs {
            stake: Some(" usdt".to_string()),
            pairs: Some("btc/usdt, eth/usdt,".to_string()),
            timeframe: Some("4h".to_string()),
            ..Default::default()
        };
        apply_overrides(&mut config, &args).unwrap();

        assert_eq!(config.stake_currency, "USDT");
        assert_eq!(config.pair_whitelist(), vec![".*/USDT".to_string()]);
        assert_eq!(config.pairs, vec!["BTC/USDT", "ETH/USDT"]);
        assert_eq!(config.timeframe, "4h");

        let universe = PairUniverse::from_config(&config).unwrap();
        assert!(universe.accepts(&PairId::new("BTC/USDT")));
        assert!(!universe.accepts(&PairId::new("BTC/BUSD")));
    }

    #[test]
    fn test_overrides_replace_grid_and_window() {
        let mut config = Config::default();
        let args = GenerateArgs {
            timerange: Some("20210101-20210301".to_string()),
            min_prices: Some("0, 0.05".to_string()),
            intervals: Some("weekly,daily".to_string()),
            number_assets: Some("5,10".to_string()),
            ..Default::default()
        };
        apply_overrides(&mut config, &args).unwrap();

        assert_eq!(config.time_range().unwrap().to_string(), "20210101-20210301");
        assert_eq!(config.filter_prices, vec![0.0, 0.05]);
        assert_eq!(config.intervals, vec!["weekly", "daily"]);
        assert_eq!(config.number_of_assets, vec![5, 10]);
        assert_eq!(Generator::new(config).unwrap().jobs().len(), 8);
    }

    #[test]
    fn test_unparsable_price_list_fails_validation() {
        let mut config = Config::default();
        let args = GenerateArgs {
            min_prices: Some("cheap,x".to_string()),
            ..Default::default()
        };
        apply_overrides(&mut config, &args).unwrap();

        assert!(config.filter_prices.is_empty());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyList("filter_prices"))
        ));
        assert!(Generator::new(config).is_err());
    }

    #[test]
    fn test_bad_timerange_is_an_error() {
        let mut config = Config::default();
        let args = GenerateArgs {
            timerange: Some("20210101".to_string()),
            ..Default::default()
        };
        assert!(apply_overrides(&mut config, &args).is_err());
    }
}
