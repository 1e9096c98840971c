use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::market_data::interval::MIN_WINDOW;

#[derive(Parser)]
#[command(author, version, about = "Hidden liquidity scanner: absorption and VWAP snapback scoring")]
pub struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, env = "HLS_CONFIG", default_value = "hidden_liquidity.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP analysis service (default)
    Serve {
        /// Listen address, overrides the config file (e.g. "127.0.0.1:5000")
        #[arg(long)]
        bind: Option<String>,
    },

    /// Score a list of tickers once and print a summary per ticker
    Scan {
        /// Tickers to scan; defaults to `scan_tickers` from the config
        tickers: Vec<String>,

        /// Absorption share of the score, in percent
        #[arg(long, default_value_t = 50.0)]
        weight: f64,

        /// Rolling window size (at least 5)
        #[arg(long, default_value_t = 20, value_parser = parse_window)]
        window: usize,

        #[arg(long)]
        period: Option<String>,

        #[arg(long)]
        interval: Option<String>,
    },

    /// Sweep the calibration universe and write the score multiplier
    Calibrate {
        /// Where to write the artifact; defaults to `calibration_path`
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Write the effective configuration to `--config`
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_window(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|e| format!("'{s}' is not a window size: {e}"))?;
    if n < MIN_WINDOW {
        return Err(format!("window must be at least {MIN_WINDOW}, got {n}"));
    }
    Ok(n)
}
