//! Volume-ranked pairlist generation
//!
//! Turns historical daily candles for a universe of trading pairs into
//! per-period lists of the most liquid pairs, ready to be used as backtest
//! pair universes. Also ships the hyperopt loss used to score those
//! backtests.
//!
//! The pipeline is:
//! 1. [`universe::PairUniverse`] picks the candidate pairs
//! 2. [`data::load_pairs`] reads their candle history
//! 3. [`volume::QuoteVolumeTable`] joins `volume * close` per pair on timestamp
//! 4. [`slicer::slice_periods`] cuts the window into calendar periods
//! 5. [`ranker::rank_periods`] keeps the top N pairs of every period
//!
//! [`generator::Generator`] drives steps 3-5 over the whole
//! filter-price x interval x N grid and writes the results.
//!
//! ```no_run
//! use pairlist_generator::{data, generator::Generator, universe::PairUniverse, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("configs/busd_1d.json")?;
//!     let pairs = PairUniverse::from_config(&config)?.resolve(&config, &config.data_dir)?;
//!     let series = data::load_pairs(&config.data_dir, &pairs, &config.timeframe)?;
//!     let written = Generator::new(config)?.run(&series, false, None)?;
//!     println!("Wrote {} pairlists", written.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod generator;
pub mod loss;
pub mod ranker;
pub mod slicer;
pub mod types;
pub mod universe;
pub mod volume;

pub use config::Config;
pub use types::*;
