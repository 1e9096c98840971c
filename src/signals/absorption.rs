// =============================================================================
// Absorption Detector — volume spikes that fail to move price
// =============================================================================
//
// An "absorption" bar trades far more volume than its same-day neighbours
// while the candle body stays small:
//
//   z           = (volume - mean_n) / std_n      (0 when std_n == 0)
//   price_change = |close - open| / open
//
//   flagged when z > z_threshold AND price_change < price_change_threshold
//
// mean_n / std_n cover the `n` bars before the current one within the same
// trading day.  Bars without a full same-day window never fire.

use tracing::debug;

use crate::signals::rolling::DayWindow;
use crate::types::{AbsorptionSignal, Bar};

/// Stateless absorption detector.
#[derive(Debug, Clone, Copy)]
pub struct AbsorptionDetector {
    pub n: usize,
    pub z_threshold: f64,
    pub price_change_threshold: f64,
}

impl AbsorptionDetector {
    pub fn new(n: usize, z_threshold: f64, price_change_threshold: f64) -> Self {
        Self {
            n,
            z_threshold,
            price_change_threshold,
        }
    }

    /// Scan `bars` in order and return every absorption bar, oldest first.
    pub fn detect(&self, bars: &[Bar]) -> Vec<AbsorptionSignal> {
        let mut window = DayWindow::new(self.n);
        let mut signals = Vec::new();

        for (index, bar) in bars.iter().enumerate() {
            let stats = window.advance(bar.trading_day(), Some(bar.volume));

            if index < self.n {
                continue;
            }
            let Some(stats) = stats else {
                continue;
            };

            let z_score = if stats.std == 0.0 {
                0.0
            } else {
                (bar.volume - stats.mean) / stats.std
            };

            let price_change = (bar.close - bar.open).abs() / bar.open;

            if z_score > self.z_threshold && price_change < self.price_change_threshold {
                signals.push(AbsorptionSignal {
                    index,
                    time: bar.timestamp,
                    volume: bar.volume,
                    avg_volume: stats.mean,
                    z_score,
                    price_change,
                });
            }
        }

        debug!(
            bars = bars.len(),
            n = self.n,
            signals = signals.len(),
            "absorption detection complete"
        );

        signals
    }
}

/// Convenience wrapper around [`AbsorptionDetector::detect`].
pub fn detect_absorption(
    bars: &[Bar],
    n: usize,
    z_threshold: f64,
    price_change_threshold: f64,
) -> Vec<AbsorptionSignal> {
    AbsorptionDetector::new(n, z_threshold, price_change_threshold).detect(bars)
}
