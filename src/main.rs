// =============================================================================
// Hidden Liquidity — Main Entry Point
// =============================================================================
//
// Subcommands:
//   serve        HTTP analysis service (default)
//   scan         one-shot scoring of a ticker list
//   calibrate    offline sweep that writes the score multiplier
//   init-config  dump the effective configuration
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod calibration;
mod cli;
mod config;
mod market_data;
mod signals;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::calibration::Calibration;
use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::market_data::{BarProvider, YahooProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    config.apply_env_overrides();

    let provider: Arc<dyn BarProvider> =
        Arc::new(YahooProvider::new().context("failed to build market data client")?);

    // ── 2. Dispatch ──────────────────────────────────────────────────────
    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => serve(config, provider, bind).await,
        Commands::Scan {
            tickers,
            weight,
            window,
            period,
            interval,
        } => {
            let tickers = if tickers.is_empty() {
                config.scan_tickers.clone()
            } else {
                tickers
            };
            let period = period.unwrap_or_else(|| config.default_period.clone());
            let interval = interval.unwrap_or_else(|| config.default_interval.clone());
            scan(&config, provider.as_ref(), &tickers, weight, window, &period, &interval).await;
            Ok(())
        }
        Commands::Calibrate { output } => calibrate(&config, provider.as_ref(), output).await,
        Commands::InitConfig { force } => {
            if cli.config.exists() && !force {
                anyhow::bail!(
                    "{} already exists; pass --force to overwrite",
                    cli.config.display()
                );
            }
            config.save(&cli.config)?;
            println!("Wrote configuration to {}.", cli.config.display());
            Ok(())
        }
    }
}

// =============================================================================
// serve
// =============================================================================

async fn serve(
    config: AppConfig,
    provider: Arc<dyn BarProvider>,
    bind: Option<String>,
) -> Result<()> {
    let bind_addr = bind.unwrap_or_else(|| config.bind_addr.clone());
    let calibration = Calibration::load_or_default(&config.calibration_path);

    info!(
        bind_addr = %bind_addr,
        multiplier = calibration.multiplier,
        "Hidden liquidity service starting"
    );

    let state = Arc::new(AppState::new(config, provider, calibration));
    let app = api::rest::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            warn!("Shutdown signal received — stopping gracefully");
        })
        .await
        .context("API server failed")?;

    info!("Hidden liquidity service shut down complete.");
    Ok(())
}

// =============================================================================
// scan
// =============================================================================

async fn scan(
    config: &AppConfig,
    provider: &dyn BarProvider,
    tickers: &[String],
    weight: f64,
    window: usize,
    period: &str,
    interval: &str,
) {
    let calibration = Calibration::load_or_default(&config.calibration_path);

    for ticker in tickers {
        println!("\nAnalyzing ticker: {ticker}");

        let series = match provider.fetch(ticker, period, interval).await {
            Ok(series) => series,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "scan failed");
                println!("Error analyzing {ticker}: {e}");
                continue;
            }
        };

        let report =
            analysis::analyze_series(&series, window, config, calibration.multiplier, weight);

        println!("Analyzed {} bars of {ticker}", series.len());
        println!("Found {} absorption signals", report.absorption_count);
        println!("Found {} VWAP signals", report.vwap_count);
        println!(
            "Strength: absorption {:.2}, VWAP {:.2} (multiplier {:.2})",
            report.score_breakdown.absorption_strength,
            report.score_breakdown.vwap_strength,
            report.score_breakdown.calibration_multiplier
        );
        println!("Hidden Liquidity Score: {:.2}/100", report.score);
    }
}

// =============================================================================
// calibrate
// =============================================================================

async fn calibrate(
    config: &AppConfig,
    provider: &dyn BarProvider,
    output: Option<PathBuf>,
) -> Result<()> {
    let params = &config.calibration;
    info!(tickers = params.universe.len(), n = params.n, "calibration sweep starting");

    let report = calibration::run_calibration(provider, params).await?;

    for t in &report.tickers {
        println!(
            "{}: {} suspicious bars, raw score = {:.2}",
            t.ticker, t.suspicious_bars, t.raw_score
        );
    }
    for t in &report.skipped {
        println!("No data for {t}, skipped.");
    }
    println!("\nMax raw score: {:.2}", report.max_raw_score);
    println!(
        "Suggested multiplier (to make max around {:.0}): {:.2}",
        params.target_score, report.multiplier
    );

    let path = output.unwrap_or_else(|| config.calibration_path.clone());
    report.to_calibration().save(&path)?;
    println!("Calibration complete. Saved to {}.", path.display());

    Ok(())
}
