//! Yahoo Finance quote provider.
//!
//! Reads the `meta` block of Yahoo's v8 chart API for each symbol and derives
//! change and change percent from the previous close. One symbol failing only
//! drops that symbol from the snapshot; the fetch fails as a whole only when
//! no symbol produced a quote.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataSource, FetchResult, QuoteProvider};
use crate::domain::{Quote, Snapshot, Symbol};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const CHART_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart/";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_time: Option<i64>,
}

/// Connection settings for the Yahoo provider.
#[derive(Debug, Clone)]
pub struct YahooOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for YahooOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 1,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Yahoo Finance quote provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    options: YahooOptions,
}

impl YahooProvider {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        options: YahooOptions,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            options,
        })
    }

    /// Chart API URL for a symbol; the symbol is percent-encoded (`^TNX` → `%5ETNX`).
    fn chart_url(symbol: &str) -> Result<reqwest::Url, DataError> {
        let url = format!(
            "{CHART_BASE_URL}{}?range=1d&interval=1d",
            encode_path_segment(symbol)
        );
        reqwest::Url::parse(&url).map_err(|e| DataError::Other(format!("bad chart URL: {e}")))
    }

    /// Turn a chart response into a quote.
    fn parse_response(
        symbol: &str,
        resp: ChartResponse,
        fetched_at: DateTime<Utc>,
    ) -> Result<Quote, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let meta = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?
            .meta;

        let price = meta.regular_market_price.ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("no regularMarketPrice for {symbol}"))
        })?;
        let previous_close = meta
            .chart_previous_close
            .or(meta.previous_close)
            .ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("no previous close for {symbol}"))
            })?;
        let observed_at = meta
            .regular_market_time
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or(fetched_at);

        let quote = Quote::from_previous_close(symbol, price, previous_close, observed_at);
        if !quote.is_valid() {
            return Err(DataError::ResponseFormatChanged(format!(
                "non-finite quote for {symbol}"
            )));
        }
        Ok(quote)
    }

    /// Delay before retry `attempt` (1-based): doubles each time, saturating.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.options.base_delay.saturating_mul(factor)
    }

    /// Execute a single symbol request with retry and circuit breaker logic.
    fn fetch_one(&self, symbol: &str) -> Result<Quote, DataError> {
        let url = Self::chart_url(symbol)?;
        let mut last_error = None;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.backoff(attempt));
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(url.clone()).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    let quote = Self::parse_response(symbol, chart, Utc::now())?;
                    self.circuit_breaker.record_success();
                    return Ok(quote);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, symbols: &[Symbol]) -> Result<FetchResult, DataError> {
        let mut snapshot = Snapshot::new();
        let mut missing = Vec::new();
        let mut first_error = None;

        for (i, symbol) in symbols.iter().enumerate() {
            match self.fetch_one(symbol) {
                Ok(quote) => snapshot.insert(quote),
                Err(e) => {
                    tracing::debug!(%symbol, error = %e, "symbol fetch failed");
                    missing.push(symbol.clone());
                    let tripped = matches!(e, DataError::CircuitBreakerTripped);
                    first_error.get_or_insert(e);
                    if tripped {
                        // Every remaining request would be refused too.
                        missing.extend(symbols.iter().skip(i + 1).cloned());
                        break;
                    }
                }
            }
        }

        if snapshot.is_empty() {
            return Err(first_error.unwrap_or(DataError::NoQuotes {
                requested: symbols.len(),
            }));
        }

        Ok(FetchResult {
            snapshot,
            missing,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Quote, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("^TNX", resp, DateTime::from_timestamp(0, 0).unwrap())
    }

    #[test]
    fn chart_url_encodes_caret() {
        let url = YahooProvider::chart_url("^TNX").unwrap();
        assert_eq!(
            url.as_str(),
            "https://query2.finance.yahoo.com/v8/finance/chart/%5ETNX?range=1d&interval=1d"
        );
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let breaker = Arc::new(CircuitBreaker::new(Duration::from_secs(600), 3));
        let provider = YahooProvider::new(breaker, YahooOptions::default()).unwrap();
        assert_eq!(provider.backoff(1), Duration::from_millis(500));
        assert_eq!(provider.backoff(3), Duration::from_millis(2000));
        assert!(provider.backoff(33) > provider.backoff(32));
        assert_eq!(provider.backoff(40), provider.backoff(33));
    }

    #[test]
    fn path_segment_encoding() {
        assert_eq!(encode_path_segment("DX-Y.NYB"), "DX-Y.NYB");
        assert_eq!(encode_path_segment("GC=F"), "GC%3DF");
    }

    #[test]
    fn parses_meta_block() {
        let q = parse(
            r#"{"chart":{"result":[{"meta":{"regularMarketPrice":4.3,
                "chartPreviousClose":4.25,"regularMarketTime":1700000000}}],"error":null}}"#,
        )
        .unwrap();
        assert_eq!(q.price, 4.3);
        assert!((q.change - 0.05).abs() < 1e-9);
        assert!((q.change_percent - 0.05 / 4.25 * 100.0).abs() < 1e-9);
        assert_eq!(q.observed_at, DateTime::from_timestamp(1_700_000_000, 0).unwrap());
    }

    #[test]
    fn falls_back_to_previous_close_and_fetch_time() {
        let q = parse(
            r#"{"chart":{"result":[{"meta":{"regularMarketPrice":4.3,"previousClose":4.3}}],
                "error":null}}"#,
        )
        .unwrap();
        assert_eq!(q.change, 0.0);
        assert_eq!(q.observed_at, DateTime::from_timestamp(0, 0).unwrap());
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let err = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn missing_price_is_format_change() {
        let body = r#"{"chart":{"result":[{"meta":{"chartPreviousClose":4.25}}],"error":null}}"#;
        let err = parse(body).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn zero_previous_close_is_rejected() {
        let err = parse(
            r#"{"chart":{"result":[{"meta":{"regularMarketPrice":4.3,"chartPreviousClose":0.0}}],
                "error":null}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }
}
