// =============================================================================
// VWAP Snapback Detector — far-from-VWAP excursions that revert
// =============================================================================
//
// Intraday VWAP uses the typical price and resets at every trading day:
//
//   typical = (high + low + close) / 3
//   vwap_t  = Σ(typical · volume) / Σ volume        (same day, up to t)
//   dev_t   = (close_t - vwap_t) / vwap_t
//   z_t     = (dev_t - mean_n) / std_n               (same-day trailing window)
//
// A snapback fires on bar t when |z_{t-1}| > z_far and |z_t| < z_close.
//
// Unlike the absorption detector there is no zero-variance guard: a window
// with std_n == 0 leaves z undefined and the bar cannot take part in a
// transition.

use tracing::debug;

use crate::signals::rolling::DayWindow;
use crate::types::{Bar, VwapDirection, VwapSignal};

/// Intraday VWAP for every bar.
///
/// `None` while the day's cumulative volume is still zero.
pub fn intraday_vwap(bars: &[Bar]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(bars.len());
    let mut day = None;
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;

    for bar in bars {
        let d = bar.trading_day();
        if day != Some(d) {
            day = Some(d);
            cum_pv = 0.0;
            cum_vol = 0.0;
        }

        cum_pv += bar.typical_price() * bar.volume;
        cum_vol += bar.volume;

        out.push((cum_vol != 0.0).then(|| cum_pv / cum_vol));
    }

    out
}

/// Stateless VWAP snapback detector.
#[derive(Debug, Clone, Copy)]
pub struct VwapSnapbackDetector {
    pub n: usize,
    pub z_far_threshold: f64,
    pub z_close_threshold: f64,
}

impl VwapSnapbackDetector {
    pub fn new(n: usize, z_far_threshold: f64, z_close_threshold: f64) -> Self {
        Self {
            n,
            z_far_threshold,
            z_close_threshold,
        }
    }

    /// Deviation z-score of every bar against its same-day trailing window.
    pub fn deviation_z_scores(&self, bars: &[Bar], vwaps: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut window = DayWindow::new(self.n);

        bars.iter()
            .zip(vwaps)
            .map(|(bar, vwap)| {
                let deviation = vwap
                    .map(|v| (bar.close - v) / v)
                    .filter(|d| d.is_finite());
                let stats = window.advance(bar.trading_day(), deviation);

                match (deviation, stats) {
                    (Some(dev), Some(s)) if s.std != 0.0 => Some((dev - s.mean) / s.std),
                    _ => None,
                }
            })
            .collect()
    }

    /// Scan `bars` in order and return every snapback, oldest first.
    pub fn detect(&self, bars: &[Bar]) -> Vec<VwapSignal> {
        let vwaps = intraday_vwap(bars);
        let z_scores = self.deviation_z_scores(bars, &vwaps);
        let mut signals = Vec::new();

        for index in self.n.max(1)..bars.len() {
            let (Some(prev_z), Some(curr_z), Some(vwap)) =
                (z_scores[index - 1], z_scores[index], vwaps[index])
            else {
                continue;
            };

            if prev_z.abs() > self.z_far_threshold && curr_z.abs() < self.z_close_threshold {
                let bar = &bars[index];
                let direction = if bar.close > vwap {
                    VwapDirection::AboveVwap
                } else {
                    VwapDirection::BelowVwap
                };

                signals.push(VwapSignal {
                    index,
                    time: bar.timestamp,
                    close_price: bar.close,
                    vwap,
                    deviation: (bar.close - vwap) / vwap,
                    prev_z,
                    curr_z,
                    direction,
                    volume: bar.volume,
                });
            }
        }

        debug!(
            bars = bars.len(),
            n = self.n,
            signals = signals.len(),
            "VWAP snapback detection complete"
        );

        signals
    }
}

/// Convenience wrapper around [`VwapSnapbackDetector::detect`].
pub fn detect_vwap_signals(
    bars: &[Bar],
    n: usize,
    z_far_threshold: f64,
    z_close_threshold: f64,
) -> Vec<VwapSignal> {
    VwapSnapbackDetector::new(n, z_far_threshold, z_close_threshold).detect(bars)
}
