//! Pairlist generator - main entry point
//!
//! This binary provides three subcommands:
//! - generate: Rank pairs by quote volume for every period and write pairlists
//! - slices: Show the period slices of a window, optionally with the top pairs
//! - score: Score a backtest trade log with the hyperopt loss functions

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Subscriber};
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod commands;

use commands::generate::GenerateArgs;

#[derive(Parser, Debug)]
#[command(name = "pairlist-generator")]
#[command(about = "Volume-ranked periodic pairlists and hyperopt loss scoring", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate pairlists for every filter price, interval and list size
    Generate {
        /// Path to configuration file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Analysis window, e.g. "20180101-20211001"
        #[arg(short, long)]
        timerange: Option<String>,

        /// Directory with {BASE}_{QUOTE}_{timeframe}.csv files
        #[arg(long)]
        data_dir: Option<String>,

        /// Output directory for pairlist JSON files
        #[arg(short, long)]
        output: Option<String>,

        /// Stake currency, e.g. "BUSD"
        #[arg(long)]
        stake: Option<String>,

        /// Candle timeframe of the history files, e.g. "1d"
        #[arg(long)]
        timeframe: Option<String>,

        /// Minimum close prices (comma-separated). E.g., "0,0.01,0.05"
        #[arg(long = "min-price")]
        min_prices: Option<String>,

        /// Slicing intervals (comma-separated). E.g., "monthly,weekly"
        #[arg(short, long)]
        intervals: Option<String>,

        /// List sizes (comma-separated). E.g., "30,60,90"
        #[arg(short = 'n', long = "number-assets")]
        number_assets: Option<String>,

        /// Explicit pairs (comma-separated) instead of scanning the data directory
        #[arg(long)]
        pairs: Option<String>,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },

    /// Show the period slices of a window
    Slices {
        /// Path to configuration file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Analysis window, e.g. "20210101-20210215"
        #[arg(short, long)]
        timerange: Option<String>,

        /// Slicing interval: monthly, weekly or daily
        #[arg(short, long, default_value = "monthly")]
        interval: String,

        /// Also load data and show the top N pairs of each period
        #[arg(long)]
        top: Option<usize>,

        /// Minimum close price used with --top
        #[arg(long = "min-price", default_value = "0")]
        min_price: f64,
    },

    /// Score a trade log with the hyperopt loss functions
    Score {
        /// CSV with close_date and profit_ratio columns
        #[arg(short, long)]
        trades: String,

        /// Scoring window; defaults to the first and last close date
        #[arg(long)]
        timerange: Option<String>,

        /// Only count wins above the small-profit threshold
        #[arg(long)]
        ignore_small_profits: bool,
    },
}

/// Console output with file and line, ANSI colored
fn console_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true)
}

/// Same format as the console, without colors
fn file_layer<S>(appender: RollingFileAppender) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Only log to file, keep console clean for the progress bar
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer(file_appender))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer())
            .with(file_layer(file_appender))
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Generate { .. } => ("generate", true), // File-only for clean progress bar
        Commands::Slices { .. } => ("slices", false),
        Commands::Score { .. } => ("score", false),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Generate {
            config,
            timerange,
            data_dir,
            output,
            stake,
            timeframe,
            min_prices,
            intervals,
            number_assets,
            pairs,
            sequential,
        } => commands::generate::run(GenerateArgs {
            config,
            timerange,
            data_dir,
            output,
            stake,
            timeframe,
            min_prices,
            intervals,
            number_assets,
            pairs,
            sequential,
        }),

        Commands::Slices {
            config,
            timerange,
            interval,
            top,
            min_price,
        } => commands::slices::run(config, timerange, interval, top, min_price),

        Commands::Score {
            trades,
            timerange,
            ignore_small_profits,
        } => commands::score::run(trades, timerange, ignore_small_profits),
    }
}
