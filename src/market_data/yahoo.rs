// =============================================================================
// Yahoo Finance Chart Client — historical intraday bars
// =============================================================================
//
// GET /v8/finance/chart/{symbol}?range={period}&interval={interval}
//
// The chart endpoint returns parallel arrays (timestamps plus one array per
// OHLCV field).  Halted or pre-listing slots come back as `null` in any of
// the quote arrays; those rows are dropped.  Timestamps are UNIX seconds and
// are shifted into the exchange's `gmtoffset` so that trading days follow the
// exchange calendar.
// =============================================================================

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::market_data::{BarProvider, ProviderError};
use crate::types::{Bar, BarSeries};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// The chart API rejects requests without a browser-like user agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) hidden-liquidity/1.0";

/// Yahoo Finance chart API client.
#[derive(Clone)]
pub struct YahooProvider {
    base_url: reqwest::Url,
    client: reqwest::Client,
}

impl YahooProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at a different host (proxies, mirrors).
    pub fn with_base_url(base_url: &str) -> Result<Self, ProviderError> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| ProviderError::Api(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Api(format!("'{base_url}' cannot be a base URL")));
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        debug!(base_url = %base_url, "YahooProvider initialised");

        Ok(Self { base_url, client })
    }

    /// Chart URL for `symbol`, which is pushed as one percent-encoded path
    /// segment so it can never add segments or query parameters.
    fn chart_url(&self, symbol: &str) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v8", "finance", "chart"])
                .push(symbol);
        }
        url
    }
}

#[async_trait]
impl BarProvider for YahooProvider {
    #[instrument(skip(self), name = "yahoo::fetch")]
    async fn fetch(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<BarSeries, ProviderError> {
        let url = self.chart_url(symbol);

        let resp = self
            .client
            .get(url.clone())
            .query(&[("range", period), ("interval", interval)])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        // Unknown symbols come back as 404 with a chart.error payload, so the
        // body is inspected before the status.
        match serde_json::from_str::<ChartEnvelope>(&body) {
            Ok(envelope) => parse_chart(symbol, period, interval, envelope),
            Err(_) if !status.is_success() => Err(ProviderError::Api(format!(
                "GET {url} returned {status}: {body}"
            ))),
            Err(e) => Err(ProviderError::Malformed(format!(
                "chart response for '{symbol}' is not valid JSON: {e}"
            ))),
        }
    }
}

// =============================================================================
// Response payload
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC, in seconds.
    #[serde(default)]
    gmtoffset: i32,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn parse_chart(
    symbol: &str,
    period: &str,
    interval: &str,
    envelope: ChartEnvelope,
) -> Result<BarSeries, ProviderError> {
    if let Some(err) = envelope.chart.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        return Err(ProviderError::Api(format!("{}: {}", err.code, err.description)));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(ProviderError::NotFound {
            symbol: symbol.to_string(),
        });
    };

    let offset = FixedOffset::east_opt(result.meta.gmtoffset).ok_or_else(|| {
        ProviderError::Malformed(format!("invalid gmtoffset {}", result.meta.gmtoffset))
    })?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    let mut skipped = 0usize;

    for (i, &ts) in result.timestamp.iter().enumerate() {
        let field = |col: &[Option<f64>]| col.get(i).copied().flatten();

        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            field(&quote.open[..]),
            field(&quote.high[..]),
            field(&quote.low[..]),
            field(&quote.close[..]),
            field(&quote.volume[..]),
        ) else {
            skipped += 1;
            continue;
        };

        let timestamp = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| ProviderError::Malformed(format!("timestamp {ts} out of range")))?
            .with_timezone(&offset);

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if skipped > 0 {
        warn!(symbol, skipped, "dropped chart rows with missing OHLCV fields");
    }

    debug!(symbol, period, interval, count = bars.len(), "bars fetched");
    BarSeries::new(symbol, period, interval, bars)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn parse(json: &str) -> Result<BarSeries, ProviderError> {
        let envelope: ChartEnvelope = serde_json::from_str(json).expect("fixture is valid JSON");
        parse_chart("AAPL", "5d", "5m", envelope)
    }

    #[test]
    fn parses_bars_in_exchange_time() {
        let json = r#"{
            "chart": {
                "result": [{
                    "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                    "timestamp": [1709562600, 1709562900, 1709563200],
                    "indicators": { "quote": [{
                        "open":   [175.0, 175.2, 175.1],
                        "high":   [175.5, 175.4, 175.3],
                        "low":    [174.8, 175.0, 174.9],
                        "close":  [175.2, 175.1, 175.0],
                        "volume": [120000, 80000, 95000]
                    }] }
                }],
                "error": null
            }
        }"#;

        let series = parse(json).unwrap();
        assert_eq!(series.len(), 3);
        let first = &series.bars()[0];
        assert_eq!(first.timestamp.offset().local_minus_utc(), -18000);
        assert_eq!(first.trading_day(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert!((first.volume - 120000.0).abs() < f64::EPSILON);
        assert!((series.bars()[2].close - 175.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rows_with_nulls_are_dropped() {
        let json = r#"{
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": 0 },
                    "timestamp": [1709562600, 1709562900],
                    "indicators": { "quote": [{
                        "open":   [1.0, null],
                        "high":   [1.0, 1.0],
                        "low":    [1.0, 1.0],
                        "close":  [1.0, 1.0],
                        "volume": [10, 10]
                    }] }
                }]
            }
        }"#;
        assert_eq!(parse(json).unwrap().len(), 1);
    }

    #[test]
    fn chart_not_found_error_maps_to_not_found() {
        let json = r#"{
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        }"#;
        assert!(matches!(parse(json), Err(ProviderError::NotFound { .. })));
    }

    #[test]
    fn other_chart_errors_are_api_errors() {
        let json = r#"{
            "chart": {
                "result": null,
                "error": { "code": "Bad Request", "description": "Invalid input - interval=7m is not supported" }
            }
        }"#;
        match parse(json) {
            Err(ProviderError::Api(msg)) => assert!(msg.contains("interval=7m")),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn empty_result_is_not_found() {
        let json = r#"{
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": 0 },
                    "indicators": { "quote": [{}] }
                }]
            }
        }"#;
        assert!(matches!(parse(json), Err(ProviderError::NotFound { .. })));
    }

    #[test]
    fn chart_url_appends_symbol_segment() {
        let provider = YahooProvider::with_base_url("https://example.test/").unwrap();
        assert_eq!(
            provider.chart_url("AAPL").as_str(),
            "https://example.test/v8/finance/chart/AAPL"
        );
    }

    #[test]
    fn symbol_cannot_inject_query_or_path() {
        let provider = YahooProvider::with_base_url("https://example.test").unwrap();

        let url = provider.chart_url("AAPL?range=max");
        assert_eq!(url.query(), None);
        assert_eq!(url.path(), "/v8/finance/chart/AAPL%3Frange=max");

        let url = provider.chart_url("../../v7/quote");
        assert_eq!(url.path_segments().unwrap().count(), 4);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(YahooProvider::with_base_url("not a url").is_err());
    }
}
