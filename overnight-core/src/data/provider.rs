//! Quote provider trait and structured error types.
//!
//! The QuoteProvider trait abstracts over snapshot sources (Yahoo Finance,
//! CSV replay, scripted fixtures) so the refresh loop can swap them and tests
//! can run without a network.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Snapshot, Symbol};

/// Structured error types for quote fetching.
///
/// A returned error means the whole fetch failed (DataUnavailable). Symbols
/// that fail individually are reported in `FetchResult::missing` instead.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("no quotes returned for any of {requested} requested symbols")]
    NoQuotes { requested: usize },

    #[error("data error: {0}")]
    Other(String),
}

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    Replay,
    Scripted,
}

/// Result of a fetch that produced at least a partial snapshot.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub snapshot: Snapshot,
    /// Requested symbols that came back without a usable quote.
    pub missing: Vec<Symbol>,
    pub source: DataSource,
}

impl FetchResult {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Trait for quote providers.
///
/// Implementations omit symbols they cannot serve rather than inventing a
/// zero price. `fetch` returns `Err` only when nothing usable came back.
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the latest quote for each symbol.
    fn fetch(&self, symbols: &[Symbol]) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}
