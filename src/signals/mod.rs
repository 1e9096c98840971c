// =============================================================================
// Signals Module
// =============================================================================
//
// Detection and scoring pipeline:
// - Day-partitioned rolling window statistics
// - Absorption (high volume, muted price) detector
// - VWAP snapback (far → near deviation) detector
// - Log-compressed, calibrated score aggregation

pub mod absorption;
pub mod rolling;
pub mod score;
pub mod vwap;

pub use absorption::detect_absorption;
pub use score::{ScoreAggregator, ScoreBreakdown};
pub use vwap::detect_vwap_signals;
