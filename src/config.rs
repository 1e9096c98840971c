// =============================================================================
// Service Configuration — detector thresholds, universe, paths
// =============================================================================
//
// Every tunable of the analysis service lives here.  The file is plain JSON;
// all fields carry `#[serde(default)]` so that a partial (or empty) file
// loads, and saving uses an atomic tmp + rename.
//
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_calibration_path() -> PathBuf {
    PathBuf::from("calibration.json")
}

fn default_period() -> String {
    "5d".to_string()
}

fn default_interval() -> String {
    "5m".to_string()
}

fn default_weight() -> f64 {
    50.0
}

fn default_absorption_z() -> f64 {
    3.0
}

fn default_price_change() -> f64 {
    0.002
}

fn default_z_far() -> f64 {
    1.5
}

fn default_z_close() -> f64 {
    0.75
}

fn default_calibration_n() -> usize {
    20
}

fn default_target_score() -> f64 {
    80.0
}

fn default_universe() -> Vec<String> {
    [
        "AAPL", "MSFT", "NVDA", "GOOGL", "META", "GME", "AMC", "SPY", "QQQ", "IWM", "JNJ", "KO",
        "WMT", "TSLA", "AMD", "COIN", "SQ", "SHOP",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_scan_tickers() -> Vec<String> {
    ["AAPL", "TSLA", "NVDA", "SPY", "AMD"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// =============================================================================
// Detector thresholds
// =============================================================================

/// Absorption trigger thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsorptionThresholds {
    #[serde(default = "default_absorption_z")]
    pub z_threshold: f64,

    /// Maximum `|close - open| / open` for a bar to count as absorbed.
    #[serde(default = "default_price_change")]
    pub price_change_threshold: f64,
}

impl Default for AbsorptionThresholds {
    fn default() -> Self {
        Self {
            z_threshold: default_absorption_z(),
            price_change_threshold: default_price_change(),
        }
    }
}

/// VWAP snapback thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VwapThresholds {
    /// |z| the previous bar must exceed.
    #[serde(default = "default_z_far")]
    pub z_far_threshold: f64,

    /// |z| the current bar must fall below.
    #[serde(default = "default_z_close")]
    pub z_close_threshold: f64,
}

impl Default for VwapThresholds {
    fn default() -> Self {
        Self {
            z_far_threshold: default_z_far(),
            z_close_threshold: default_z_close(),
        }
    }
}

// =============================================================================
// Calibration job parameters
// =============================================================================

/// Fixed inputs of the offline calibration sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationParams {
    #[serde(default = "default_calibration_n")]
    pub n: usize,

    #[serde(default = "default_absorption_z")]
    pub z_threshold: f64,

    #[serde(default = "default_price_change")]
    pub price_change_threshold: f64,

    /// Score the most active ticker of the universe should map to.
    #[serde(default = "default_target_score")]
    pub target_score: f64,

    #[serde(default = "default_period")]
    pub period: String,

    #[serde(default = "default_interval")]
    pub interval: String,

    #[serde(default = "default_universe")]
    pub universe: Vec<String>,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            n: default_calibration_n(),
            z_threshold: default_absorption_z(),
            price_change_threshold: default_price_change(),
            target_score: default_target_score(),
            period: default_period(),
            interval: default_interval(),
            universe: default_universe(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // --- Service ------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Where the calibration artifact is read from and written to.
    #[serde(default = "default_calibration_path")]
    pub calibration_path: PathBuf,

    // --- Request defaults ---------------------------------------------------

    #[serde(default = "default_period")]
    pub default_period: String,

    #[serde(default = "default_interval")]
    pub default_interval: String,

    /// Absorption share of the blended score, in percent.
    #[serde(default = "default_weight")]
    pub default_weight: f64,

    // --- Detectors ----------------------------------------------------------

    #[serde(default)]
    pub absorption: AbsorptionThresholds,

    #[serde(default)]
    pub vwap: VwapThresholds,

    // --- Batch jobs ---------------------------------------------------------

    #[serde(default)]
    pub calibration: CalibrationParams,

    #[serde(default = "default_scan_tickers")]
    pub scan_tickers: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            calibration_path: default_calibration_path(),
            default_period: default_period(),
            default_interval: default_interval(),
            default_weight: default_weight(),
            absorption: AbsorptionThresholds::default(),
            vwap: VwapThresholds::default(),
            calibration: CalibrationParams::default(),
            scan_tickers: default_scan_tickers(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            calibration_path = %config.calibration_path.display(),
            "config loaded"
        );

        Ok(config)
    }

    /// Persist to `path` atomically (write `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "config saved (atomic)");
        Ok(())
    }

    /// Apply `HLS_BIND_ADDR` / `HLS_CALIBRATION_PATH` overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("HLS_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }
        if let Ok(path) = std::env::var("HLS_CALIBRATION_PATH") {
            if !path.trim().is_empty() {
                self.calibration_path = PathBuf::from(path.trim());
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:5000");
        assert_eq!(cfg.default_period, "5d");
        assert_eq!(cfg.default_interval, "5m");
        assert!((cfg.default_weight - 50.0).abs() < f64::EPSILON);
        assert!((cfg.absorption.z_threshold - 3.0).abs() < f64::EPSILON);
        assert!((cfg.absorption.price_change_threshold - 0.002).abs() < f64::EPSILON);
        assert!((cfg.vwap.z_far_threshold - 1.5).abs() < f64::EPSILON);
        assert!((cfg.vwap.z_close_threshold - 0.75).abs() < f64::EPSILON);
        assert_eq!(cfg.calibration.n, 20);
        assert_eq!(cfg.calibration.universe.len(), 18);
        assert_eq!(cfg.calibration.universe[0], "AAPL");
        assert_eq!(cfg.scan_tickers.len(), 5);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:5000");
        assert_eq!(cfg.calibration_path, PathBuf::from("calibration.json"));
        assert!((cfg.calibration.target_score - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "vwap": { "z_far_threshold": 2.0 }, "scan_tickers": ["QQQ"] }"#;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        assert!((cfg.vwap.z_far_threshold - 2.0).abs() < f64::EPSILON);
        assert!((cfg.vwap.z_close_threshold - 0.75).abs() < f64::EPSILON);
        assert_eq!(cfg.scan_tickers, vec!["QQQ"]);
        assert!((cfg.absorption.z_threshold - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hidden_liquidity.json");

        let mut cfg = AppConfig::default();
        cfg.default_weight = 70.0;
        cfg.calibration.universe = vec!["SPY".into()];
        cfg.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert!((loaded.default_weight - 70.0).abs() < f64::EPSILON);
        assert_eq!(loaded.calibration.universe, vec!["SPY"]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(dir.path().join("absent.json")).is_err());
    }
}
