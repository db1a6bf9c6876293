//! Score command: evaluate a trade log with the hyperopt losses

use anyhow::Result;
use chrono::{DateTime, Utc};
use pairlist_generator::data::TimeRange;
use pairlist_generator::loss::{
    load_trade_log, trade_date_bounds, GeniusLoss, GeniusLossSettings, ResultScorer,
    SortinoDailyLoss,
};
use tracing::info;

pub fn run(
    trades_path: String,
    timerange: Option<String>,
    ignore_small_profits: bool,
) -> Result<()> {
    let trades = load_trade_log(&trades_path)?;
    info!("Loaded {} trades from {}", trades.len(), trades_path);

    let (min_date, max_date) = match timerange {
        Some(ref s) => {
            let range = TimeRange::parse(s)?;
            (
                DateTime::<Utc>::from_naive_utc_and_offset(range.start, Utc),
                DateTime::<Utc>::from_naive_utc_and_offset(range.end, Utc),
            )
        }
        None => match trade_date_bounds(&trades) {
            Some(bounds) => bounds,
            None => anyhow::bail!("Trade log {} is empty and no --timerange given", trades_path),
        },
    };

    let scorers: Vec<Box<dyn ResultScorer>> = vec![
        Box::new(GeniusLoss::new(GeniusLossSettings {
            ignore_small_profits,
            ..Default::default()
        })),
        Box::new(SortinoDailyLoss::default()),
    ];

    println!("\n{}", "=".repeat(60));
    println!("LOSS SCORES (lower is better)");
    println!("{}", "=".repeat(60));
    println!("Trades:             {}", trades.len());
    println!(
        "Window:             {} .. {}",
        min_date.format("%Y-%m-%d"),
        max_date.format("%Y-%m-%d")
    );
    for scorer in &scorers {
        let value = scorer.score(&trades, min_date, max_date);
        info!("{} = {}", scorer.name(), value);
        println!("{:<20}{:.6}", format!("{}:", scorer.name()), value);
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_trade_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        std::fs::write(
            &path,
            "close_date,profit_ratio\n\
             2021-01-01 12:00:00,0.05\n\
             2021-01-03 12:00:00,-0.02\n",
        )
        .unwrap();
        let path = path.display().to_string();

        assert!(run(path.clone(), None, false).is_ok());
        assert!(run(path, Some("20210101-20210201".to_string()), true).is_ok());
    }

    #[test]
    fn test_empty_log_needs_timerange() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        std::fs::write(&path, "close_date,profit_ratio\n").unwrap();
        let path = path.display().to_string();

        assert!(run(path.clone(), None, false).is_err());
        assert!(run(path, Some("20210101-20210201".to_string()), false).is_ok());
    }
}
