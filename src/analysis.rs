// =============================================================================
// Analysis Pipeline — fetch → detect → detect → score
// =============================================================================
//
// One synchronous pass per request: the bar series is fully materialised
// before either detector runs, and the calibration multiplier arrives by
// value from the caller.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AppConfig;
use crate::market_data::{window_size_for, BarProvider, ProviderError};
use crate::signals::{detect_absorption, detect_vwap_signals, ScoreAggregator, ScoreBreakdown};
use crate::types::{AbsorptionSignal, BarSeries, VwapSignal};

/// Fully resolved analysis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub ticker: String,
    pub interval: String,
    pub period: String,
    /// Absorption share of the score, in percent.
    pub weight: f64,
}

/// Everything the dashboard needs to chart and explain one run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub score: f64,
    /// Detector strengths, weights and multiplier behind `score`.
    pub score_breakdown: ScoreBreakdown,
    pub absorption_count: usize,
    pub vwap_count: usize,
    pub absorption_signals: Vec<AbsorptionSignal>,
    pub vwap_signals: Vec<VwapSignal>,
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
    pub times: Vec<String>,
    /// Highest close of the series.
    pub high: f64,
    /// Lowest close of the series.
    pub low: f64,
}

/// Run both detectors and the aggregator over an already-fetched series.
pub fn analyze_series(
    series: &BarSeries,
    n: usize,
    config: &AppConfig,
    calibration_multiplier: f64,
    weight: f64,
) -> AnalysisReport {
    let bars = series.bars();

    let absorption_signals = detect_absorption(
        bars,
        n,
        config.absorption.z_threshold,
        config.absorption.price_change_threshold,
    );

    let vwap_signals = detect_vwap_signals(
        bars,
        n,
        config.vwap.z_far_threshold,
        config.vwap.z_close_threshold,
    );

    let score_breakdown = ScoreAggregator::new(calibration_multiplier).breakdown(
        &absorption_signals,
        &vwap_signals,
        bars.len(),
        weight,
    );

    let prices: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let times: Vec<String> = bars.iter().map(|b| b.timestamp.to_rfc3339()).collect();

    let high = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let low = prices.iter().copied().fold(f64::INFINITY, f64::min);

    AnalysisReport {
        score: score_breakdown.score,
        score_breakdown,
        absorption_count: absorption_signals.len(),
        vwap_count: vwap_signals.len(),
        absorption_signals,
        vwap_signals,
        prices,
        volumes,
        times,
        high,
        low,
    }
}

/// Fetch `params.ticker` and analyse it with the interval's window size.
pub async fn analyze(
    provider: &dyn BarProvider,
    config: &AppConfig,
    calibration_multiplier: f64,
    params: &AnalysisParams,
) -> Result<AnalysisReport, ProviderError> {
    let series = provider
        .fetch(&params.ticker, &params.period, &params.interval)
        .await?;

    let n = window_size_for(&params.interval);
    let report = analyze_series(&series, n, config, calibration_multiplier, params.weight);

    info!(
        ticker = %series.symbol(),
        interval = %series.interval(),
        period = %series.period(),
        bars = series.len(),
        n,
        absorption = report.absorption_count,
        vwap = report.vwap_count,
        score = format!("{:.2}", report.score),
        "analysis complete"
    );

    Ok(report)
}
