// =============================================================================
// Shared types used across the hidden-liquidity pipeline
// =============================================================================

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::market_data::ProviderError;

// =============================================================================
// Bars
// =============================================================================

/// One OHLCV sample over a fixed interval.
///
/// The timestamp carries the exchange's UTC offset so that the calendar date
/// of the bar is the exchange-local trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Trading day this bar belongs to.
    pub fn trading_day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// `(high + low + close) / 3`
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Ordered bars for one symbol / period / interval triple.
///
/// Always non-empty with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    symbol: String,
    period: String,
    interval: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(
        symbol: impl Into<String>,
        period: impl Into<String>,
        interval: impl Into<String>,
        bars: Vec<Bar>,
    ) -> Result<Self, ProviderError> {
        let symbol = symbol.into();

        if bars.is_empty() {
            return Err(ProviderError::NotFound { symbol });
        }

        if let Some(pos) = bars
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(ProviderError::Malformed(format!(
                "bars for '{}' are not strictly increasing at index {}",
                symbol,
                pos + 1
            )));
        }

        Ok(Self {
            symbol,
            period: period.into(),
            interval: interval.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn period(&self) -> &str {
        &self.period
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }
}

// =============================================================================
// Signals
// =============================================================================

/// A bar flagged by the absorption detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsorptionSignal {
    pub index: usize,
    pub time: DateTime<FixedOffset>,
    pub volume: f64,
    /// Mean volume of the trailing same-day window.
    pub avg_volume: f64,
    pub z_score: f64,
    /// `|close - open| / open`
    pub price_change: f64,
}

/// Side of the VWAP the close finished on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VwapDirection {
    AboveVwap,
    BelowVwap,
}

/// A far-to-near VWAP deviation transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VwapSignal {
    pub index: usize,
    pub time: DateTime<FixedOffset>,
    pub close_price: f64,
    pub vwap: f64,
    /// `(close - vwap) / vwap`, signed.
    pub deviation: f64,
    /// Signed deviation z-score of the previous bar.
    pub prev_z: f64,
    /// Signed deviation z-score of this bar.
    pub curr_z: f64,
    pub direction: VwapDirection,
    pub volume: f64,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::{Duration, TimeZone};

    /// New York session offset used by the fixtures.
    pub fn ny() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    /// A flat bar at `price` with the given volume, `minute` minutes after the
    /// 09:30 open of `day` (day 0 = 2024-03-04).
    pub fn flat_bar(day: i64, minute: i64, price: f64, volume: f64) -> Bar {
        let open = ny().with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap();
        Bar {
            timestamp: open + Duration::days(day) + Duration::minutes(minute),
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    /// `count` five-minute bars on `day` with per-bar volumes from `volume`.
    pub fn day_of_bars(day: i64, count: usize, volume: impl Fn(usize) -> f64) -> Vec<Bar> {
        (0..count)
            .map(|i| flat_bar(day, i as i64 * 5, 100.0, volume(i)))
            .collect()
    }
}
