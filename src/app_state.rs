// =============================================================================
// Central Application State
// =============================================================================
//
// Shared by every request handler via `Arc<AppState>`.  Requests never mutate
// it: the provider is stateless and the calibration is copied out per
// request.  The only writer of the calibration slot is the reload endpoint,
// which swaps in the artifact produced by the offline sweep.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use tracing::info;

use crate::calibration::Calibration;
use crate::config::AppConfig;
use crate::market_data::BarProvider;

pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<dyn BarProvider>,

    calibration: RwLock<Calibration>,

    /// Number of analyses served since start-up.
    analyses_served: AtomicU64,

    /// Instant when the service was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: AppConfig, provider: Arc<dyn BarProvider>, calibration: Calibration) -> Self {
        Self {
            config,
            provider,
            calibration: RwLock::new(calibration),
            analyses_served: AtomicU64::new(0),
            start_time: std::time::Instant::now(),
        }
    }

    /// Snapshot of the current calibration.
    pub fn calibration(&self) -> Calibration {
        self.calibration.read().clone()
    }

    /// Re-read the calibration artifact from `config.calibration_path`.
    pub fn reload_calibration(&self) -> Result<Calibration> {
        let fresh = Calibration::load(&self.config.calibration_path)?;
        *self.calibration.write() = fresh.clone();
        info!(multiplier = fresh.multiplier, "calibration reloaded");
        Ok(fresh)
    }

    pub fn record_analysis(&self) -> u64 {
        self.analyses_served.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn analyses_served(&self) -> u64 {
        self.analyses_served.load(Ordering::Relaxed)
    }
}
