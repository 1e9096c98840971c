// =============================================================================
// Bar Provider — where historical bars come from
// =============================================================================
//
// The detectors only ever see a materialised `BarSeries`.  Its source sits
// behind `BarProvider`, shared by the HTTP layer and the batch jobs as one
// `Arc<dyn BarProvider>`.
// =============================================================================

use async_trait::async_trait;
use thiserror::Error;

use crate::types::BarSeries;

/// Errors raised while fetching bars.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider has no bars for this symbol.
    #[error("No data found for ticker '{symbol}'. Check if the symbol is valid.")]
    NotFound { symbol: String },

    /// Transport failure (network, timeout, TLS).
    #[error("market data request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("market data API error: {0}")]
    Api(String),

    /// The payload could not be turned into a valid bar series.
    #[error("malformed market data: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Fetch the bars of `symbol` covering `period` at `interval` resolution.
    async fn fetch(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<BarSeries, ProviderError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use super::*;
    use crate::types::Bar;

    /// In-memory provider keyed by symbol.
    #[derive(Default)]
    pub struct StaticProvider {
        bars: HashMap<String, Vec<Bar>>,
    }

    impl StaticProvider {
        pub fn with(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
            self.bars.insert(symbol.to_string(), bars);
            self
        }
    }

    #[async_trait]
    impl BarProvider for StaticProvider {
        async fn fetch(
            &self,
            symbol: &str,
            period: &str,
            interval: &str,
        ) -> Result<BarSeries, ProviderError> {
            let bars = self.bars.get(symbol).cloned().unwrap_or_default();
            BarSeries::new(symbol, period, interval, bars)
        }
    }
}
