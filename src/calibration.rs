// =============================================================================
// Calibration — the score multiplier and the offline sweep that derives it
// =============================================================================
//
// The sweep runs the absorption detector with fixed parameters over a ticker
// universe, sums ln(1 + z) per ticker and picks the largest sum:
//
//   multiplier = target_score / max_raw_score        (target_score = 80)
//
// so that the most active ticker of the universe lands near 80 with a pure
// absorption weighting.  The result is persisted as a small JSON artifact
// that the live service reads; nothing else writes it.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::CalibrationParams;
use crate::market_data::BarProvider;
use crate::signals::detect_absorption;
use crate::signals::score::absorption_strength;
use crate::types::BarSeries;

// =============================================================================
// Artifact
// =============================================================================

/// Persisted calibration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub multiplier: f64,
    /// Human-readable local time of the sweep that produced this value.
    #[serde(default)]
    pub calibrated_at: Option<String>,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            calibrated_at: None,
        }
    }
}

impl Calibration {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read calibration from {}", path.display()))?;

        let calibration: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse calibration from {}", path.display()))?;

        info!(
            path = %path.display(),
            multiplier = calibration.multiplier,
            calibrated_at = calibration.calibrated_at.as_deref().unwrap_or("unknown"),
            "calibration loaded"
        );

        Ok(calibration)
    }

    /// Load, falling back to the default multiplier when the artifact is
    /// missing or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load calibration, using default multiplier");
            Self::default()
        })
    }

    /// Atomic write (tmp + rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise calibration to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp calibration to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp calibration to {}", path.display()))?;

        info!(path = %path.display(), multiplier = self.multiplier, "calibration saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Sweep
// =============================================================================

/// Raw absorption activity of one ticker.
#[derive(Debug, Clone, Serialize)]
pub struct TickerCalibration {
    pub ticker: String,
    pub bars: usize,
    pub suspicious_bars: usize,
    /// Σ ln(1 + z) over the ticker's absorption signals.
    pub raw_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalibrationReport {
    pub tickers: Vec<TickerCalibration>,
    /// Tickers whose bars could not be fetched.
    pub skipped: Vec<String>,
    pub max_raw_score: f64,
    pub multiplier: f64,
}

impl CalibrationReport {
    /// Derive the multiplier from per-ticker results.
    ///
    /// An empty result set uses a maximum of 1; a universe in which no
    /// ticker produced a single signal cannot be calibrated.
    pub fn from_results(
        tickers: Vec<TickerCalibration>,
        skipped: Vec<String>,
        target_score: f64,
    ) -> Result<Self> {
        let max_raw_score = if tickers.is_empty() {
            1.0
        } else {
            tickers
                .iter()
                .map(|t| t.raw_score)
                .fold(f64::NEG_INFINITY, f64::max)
        };

        if max_raw_score <= 0.0 {
            bail!(
                "no absorption signals across {} calibrated tickers; cannot derive a multiplier",
                tickers.len()
            );
        }

        Ok(Self {
            tickers,
            skipped,
            max_raw_score,
            multiplier: target_score / max_raw_score,
        })
    }

    /// Artifact stamped with the current local time.
    pub fn to_calibration(&self) -> Calibration {
        Calibration {
            multiplier: self.multiplier,
            calibrated_at: Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

/// Absorption activity of one already-fetched series.
pub fn calibrate_series(series: &BarSeries, params: &CalibrationParams) -> TickerCalibration {
    let signals = detect_absorption(
        series.bars(),
        params.n,
        params.z_threshold,
        params.price_change_threshold,
    );

    TickerCalibration {
        ticker: series.symbol().to_string(),
        bars: series.len(),
        suspicious_bars: signals.len(),
        raw_score: absorption_strength(&signals),
    }
}

/// Fetch every ticker of the universe and derive the multiplier.
///
/// Tickers that fail to fetch are logged and skipped.
pub async fn run_calibration(
    provider: &dyn BarProvider,
    params: &CalibrationParams,
) -> Result<CalibrationReport> {
    let mut results = Vec::with_capacity(params.universe.len());
    let mut skipped = Vec::new();

    for ticker in &params.universe {
        match provider.fetch(ticker, &params.period, &params.interval).await {
            Ok(series) => {
                let result = calibrate_series(&series, params);
                info!(
                    ticker = %result.ticker,
                    suspicious_bars = result.suspicious_bars,
                    raw_score = format!("{:.2}", result.raw_score),
                    "ticker calibrated"
                );
                results.push(result);
            }
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "skipping ticker during calibration");
                skipped.push(ticker.clone());
            }
        }
    }

    let report = CalibrationReport::from_results(results, skipped, params.target_score)?;

    info!(
        max_raw_score = format!("{:.2}", report.max_raw_score),
        multiplier = format!("{:.4}", report.multiplier),
        skipped = report.skipped.len(),
        "calibration sweep complete"
    );

    Ok(report)
}
