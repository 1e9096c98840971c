// =============================================================================
// Score Aggregator — blends detector output into a 0–100 score
// =============================================================================
//
//   absorption_strength = Σ ln(1 + z)        over absorption signals
//   vwap_strength       = Σ ln(1 + |prev_z|) over VWAP signals
//
//   score = (absorption_strength · w + vwap_strength · (1 - w)) · multiplier
//
// with w = absorption_weight_pct / 100, capped at 100 from above only.
// Weights outside [0, 100] and negative multipliers are passed through as-is.

use serde::Serialize;

use crate::types::{AbsorptionSignal, VwapSignal};

/// Upper bound of the blended score.
pub const MAX_SCORE: f64 = 100.0;

/// Every intermediate of one scoring call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub absorption_strength: f64,
    pub vwap_strength: f64,
    pub absorption_weight: f64,
    pub vwap_weight: f64,
    pub calibration_multiplier: f64,
}

/// Log-compressed strength of a set of absorption signals.
pub fn absorption_strength(signals: &[AbsorptionSignal]) -> f64 {
    signals.iter().map(|s| s.z_score.ln_1p()).sum()
}

/// Log-compressed strength of a set of VWAP snapbacks.
pub fn vwap_strength(signals: &[VwapSignal]) -> f64 {
    signals.iter().map(|s| s.prev_z.abs().ln_1p()).sum()
}

/// Pure scorer; the calibration multiplier is supplied at construction.
#[derive(Debug, Clone, Copy)]
pub struct ScoreAggregator {
    calibration_multiplier: f64,
}

impl ScoreAggregator {
    pub fn new(calibration_multiplier: f64) -> Self {
        Self {
            calibration_multiplier,
        }
    }

    /// Hidden-liquidity score of one analysis run, with every intermediate
    /// exposed.
    pub fn breakdown(
        &self,
        absorption: &[AbsorptionSignal],
        vwap: &[VwapSignal],
        total_bar_count: usize,
        absorption_weight_pct: f64,
    ) -> ScoreBreakdown {
        let absorption_weight = absorption_weight_pct / 100.0;
        let vwap_weight = 1.0 - absorption_weight;

        if total_bar_count == 0 {
            return ScoreBreakdown {
                score: 0.0,
                absorption_strength: 0.0,
                vwap_strength: 0.0,
                absorption_weight,
                vwap_weight,
                calibration_multiplier: self.calibration_multiplier,
            };
        }

        let a = absorption_strength(absorption);
        let v = vwap_strength(vwap);

        let score = (a * absorption_weight + v * vwap_weight) * self.calibration_multiplier;

        ScoreBreakdown {
            score: if score > MAX_SCORE { MAX_SCORE } else { score },
            absorption_strength: a,
            vwap_strength: v,
            absorption_weight,
            vwap_weight,
            calibration_multiplier: self.calibration_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::flat_bar;
    use crate::types::VwapDirection;

    fn calculate_score(
        absorption: &[AbsorptionSignal],
        vwap: &[VwapSignal],
        total_bar_count: usize,
        absorption_weight_pct: f64,
        calibration_multiplier: f64,
    ) -> f64 {
        ScoreAggregator::new(calibration_multiplier)
            .breakdown(absorption, vwap, total_bar_count, absorption_weight_pct)
            .score
    }

    fn absorption(z_score: f64) -> AbsorptionSignal {
        AbsorptionSignal {
            index: 25,
            time: flat_bar(0, 125, 100.0, 0.0).timestamp,
            volume: 5000.0,
            avg_volume: 1000.0,
            z_score,
            price_change: 0.0,
        }
    }

    fn snapback(prev_z: f64) -> VwapSignal {
        VwapSignal {
            index: 30,
            time: flat_bar(0, 150, 100.0, 0.0).timestamp,
            close_price: 100.0,
            vwap: 100.1,
            deviation: -0.001,
            prev_z,
            curr_z: 0.1,
            direction: VwapDirection::BelowVwap,
            volume: 1000.0,
        }
    }

    #[test]
    fn no_signals_scores_zero() {
        assert_eq!(calculate_score(&[], &[], 100, 50.0, 7.5), 0.0);
    }

    #[test]
    fn empty_series_scores_zero() {
        let a = vec![absorption(10.0)];
        let v = vec![snapback(3.0)];
        assert_eq!(calculate_score(&a, &v, 0, 50.0, 7.5), 0.0);
        assert_eq!(calculate_score(&a, &v, 0, 100.0, -3.0), 0.0);
    }

    #[test]
    fn blends_log_strengths() {
        let a = vec![absorption(4.0), absorption(9.0)];
        let v = vec![snapback(-2.0)];
        let m = 2.0;
        let expected = ((5.0_f64.ln() + 10.0_f64.ln()) * 0.25 + 3.0_f64.ln() * 0.75) * m;
        let got = calculate_score(&a, &v, 390, 25.0, m);
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn weight_extremes_select_one_detector() {
        let a = vec![absorption(4.0)];
        let v = vec![snapback(2.0)];
        let agg = ScoreAggregator::new(1.0);
        assert!((agg.breakdown(&a, &v, 10, 100.0).score - 5.0_f64.ln()).abs() < 1e-12);
        assert!((agg.breakdown(&a, &v, 10, 0.0).score - 3.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn never_exceeds_upper_bound() {
        let a: Vec<_> = (0..500).map(|i| absorption(3.0 + i as f64)).collect();
        let v: Vec<_> = (0..500).map(|i| snapback(1.5 + i as f64)).collect();
        for weight in [0.0, 33.0, 50.0, 100.0] {
            let s = calculate_score(&a, &v, 1000, weight, 50.0);
            assert!(s <= MAX_SCORE);
        }
        assert_eq!(calculate_score(&a, &v, 1000, 50.0, 50.0), MAX_SCORE);
    }

    #[test]
    fn no_lower_clamp_for_negative_multiplier() {
        let a = vec![absorption(4.0)];
        assert!(calculate_score(&a, &[], 10, 100.0, -1.0) < 0.0);
    }

    #[test]
    fn monotonic_in_each_z_score() {
        let agg = ScoreAggregator::new(3.0);
        let base_v = vec![snapback(2.0), snapback(-4.0)];
        let mut last = f64::NEG_INFINITY;
        for z in [3.1, 3.5, 5.0, 10.0, 50.0, 1e6] {
            let a = vec![absorption(6.0), absorption(z)];
            let s = agg.breakdown(&a, &base_v, 200, 60.0).score;
            assert!(s >= last);
            last = s;
        }

        let base_a = vec![absorption(4.0)];
        let mut last = f64::NEG_INFINITY;
        for prev in [1.6, -2.0, 3.0, -8.0, 40.0] {
            let v = vec![snapback(prev)];
            let s = agg.breakdown(&base_a, &v, 200, 60.0).score;
            assert!(s >= last);
            last = s;
        }
    }

    #[test]
    fn breakdown_reports_components() {
        let a = vec![absorption(4.0)];
        let b = ScoreAggregator::new(2.0).breakdown(&a, &[], 10, 40.0);
        assert!((b.absorption_strength - 5.0_f64.ln()).abs() < 1e-12);
        assert_eq!(b.vwap_strength, 0.0);
        assert!((b.absorption_weight - 0.4).abs() < 1e-12);
        assert!((b.vwap_weight - 0.6).abs() < 1e-12);
        assert!((b.score - 5.0_f64.ln() * 0.4 * 2.0).abs() < 1e-12);
    }
}
